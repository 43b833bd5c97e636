//! Integration tests for the socket wrappers
//!
//! These tests run real client/server exchanges over the loopback interface.

use std::time::Duration;

use inet_socket::net::{
    write_last_error, Bind, Endpoint, Error, InetAddress, InetHost, Listen, NetworkContext,
    Socket, TcpClient, TcpClientBuilder, TcpServer, TcpServerBuilder, Transfer, UdpSocket,
};
use socket2::{Domain, Protocol, Type};

#[test]
fn test_full_client_server_flow() {
    let _ctx = NetworkContext::acquire().expect("Failed to init network context");

    let mut server = TcpServer::new().expect("Failed to open server");
    server.set_primary_host(InetHost::with_address(InetAddress::LOOPBACK, 0));
    server.bind_port(0).expect("Failed to bind");
    server.listen().expect("Failed to listen");

    let listen_host = server.local_host().expect("Failed to get local host");
    println!("Server listening on {}", listen_host);

    let server_handle = std::thread::spawn(move || {
        let client = server.accept().expect("Failed to accept connection");
        println!("Server accepted connection from {}", client.primary_host());

        let message = client.recv_string(0).expect("Failed to read from client");
        assert_eq!(message, "Hello from client");

        client
            .send_string("Hello from server", 0)
            .expect("Failed to write to client");
    });

    let client = TcpClient::new(listen_host).expect("Failed to open client");
    client.connect().expect("Failed to connect");

    client
        .send_string("Hello from client", 0)
        .expect("Failed to write to server");

    let response = client.recv_string(0).expect("Failed to read from server");
    assert_eq!(response, "Hello from server");

    server_handle.join().expect("Server thread panicked");
}

#[test]
fn test_multiple_connections() {
    let server = TcpServerBuilder::new()
        .address(InetAddress::LOOPBACK)
        .backlog(10)
        .build()
        .expect("Failed to build server");

    let listen_host = server.local_host().expect("Failed to get local host");

    let server_handle = std::thread::spawn(move || {
        for i in 0..5 {
            let client = server.accept().expect("Failed to accept connection");
            let data = client.recv_vec(0).expect("Failed to read");
            client.send(&data, 0).expect("Failed to write");
            println!("Server handled connection {}", i);
        }
    });

    let mut handles = vec![];
    for i in 0..5 {
        let handle = std::thread::spawn(move || {
            let client = TcpClientBuilder::new()
                .read_timeout(Duration::from_secs(5))
                .connect(&listen_host)
                .expect("Failed to connect");

            let message = format!("Client-{}", i);
            client.send_string(&message, 0).expect("Failed to write");

            let response = client.recv_string(0).expect("Failed to read");
            assert_eq!(response, message);
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Client thread panicked");
    }

    server_handle.join().expect("Server thread panicked");
}

#[test]
fn test_byte_sequence_fidelity() {
    let server = TcpServerBuilder::new()
        .address(InetAddress::LOOPBACK)
        .build()
        .expect("Failed to build server");
    let listen_host = server.local_host().expect("Failed to get local host");

    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let server_handle = std::thread::spawn(move || {
        let client = server.accept().expect("Failed to accept");
        let mut buf = vec![0u8; 8192];
        let n = client
            .recv(&mut buf[..expected.len()], libc::MSG_WAITALL)
            .expect("Failed to read");
        assert_eq!(n, expected.len());
        assert_eq!(&buf[..n], &expected[..]);
    });

    let client = TcpClient::new(listen_host).expect("Failed to open client");
    client.connect().expect("Failed to connect");
    assert_eq!(client.send(&payload, 0).expect("Failed to write"), payload.len());

    server_handle.join().expect("Server thread panicked");
}

#[test]
fn test_fixed_size_values() {
    let server = TcpServerBuilder::new()
        .address(InetAddress::LOOPBACK)
        .build()
        .expect("Failed to build server");
    let listen_host = server.local_host().expect("Failed to get local host");

    let server_handle = std::thread::spawn(move || {
        let client = server.accept().expect("Failed to accept");
        let number: i32 = client
            .recv_value(libc::MSG_WAITALL)
            .expect("Failed to read value");
        let host: InetHost = client
            .recv_value(libc::MSG_WAITALL)
            .expect("Failed to read host");
        (number, host)
    });

    let announced = InetHost::with_address(InetAddress::from_octets(10, 9, 8, 7), 4555);

    let client = TcpClient::new(listen_host).expect("Failed to open client");
    client.connect().expect("Failed to connect");
    client.send_value(&-123_456i32, 0).expect("Failed to send value");
    client.send_value(&announced, 0).expect("Failed to send host");

    let (number, host) = server_handle.join().expect("Server thread panicked");
    assert_eq!(number, -123_456);
    assert_eq!(host, announced);
}

#[test]
fn test_short_value_reports_failure() {
    let server = TcpServerBuilder::new()
        .address(InetAddress::LOOPBACK)
        .build()
        .expect("Failed to build server");
    let listen_host = server.local_host().expect("Failed to get local host");

    let server_handle = std::thread::spawn(move || {
        let client = server.accept().expect("Failed to accept");
        client.recv_value::<u32>(libc::MSG_WAITALL)
    });

    let mut client = TcpClient::new(listen_host).expect("Failed to open client");
    client.connect().expect("Failed to connect");
    client.send(&[0xAB], 0).expect("Failed to write");
    client.close().expect("Failed to close");

    let result = server_handle.join().expect("Server thread panicked");
    assert!(matches!(
        result,
        Err(Error::ShortTransfer {
            expected: 4,
            actual: 1
        })
    ));
}

#[test]
fn test_get_sock_name_reports_bound_port() {
    let mut server = TcpServer::new().expect("Failed to open server");
    server.set_primary_host(InetHost::with_address(InetAddress::LOOPBACK, 0));
    server.bind().expect("Failed to bind");

    let local = server.local_host().expect("Failed to get local host");
    assert_eq!(local.address(), InetAddress::LOOPBACK);
    assert!(local.port() > 0);

    // The primary host is not rewritten by binding
    assert_eq!(server.primary_host().port(), 0);
}

#[test]
fn test_get_sock_name_reports_chosen_port() {
    let port = {
        let server = TcpServerBuilder::new()
            .address(InetAddress::LOOPBACK)
            .build()
            .expect("Failed to build server");
        server.local_host().expect("Failed to get local host").port()
    };

    let server = TcpServerBuilder::new()
        .address(InetAddress::LOOPBACK)
        .port(port)
        .build()
        .expect("Failed to bind chosen port");

    let local = server.local_host().expect("Failed to get local host");
    assert_eq!(local.address(), InetAddress::LOOPBACK);
    assert_eq!(local.port(), port);
    assert_eq!(server.primary_host().port(), port);
}

#[test]
fn test_invalid_socket_and_close() {
    let mut diag = Vec::new();
    let socket = Socket::open_or_invalid(Domain::from(-1), Type::STREAM, None, &mut diag);
    assert!(!socket.is_valid());
    assert!(!diag.is_empty());

    let server = TcpServerBuilder::new()
        .address(InetAddress::LOOPBACK)
        .build()
        .expect("Failed to build server");
    let listen_host = server.local_host().expect("Failed to get local host");

    let mut client = TcpClient::new(listen_host).expect("Failed to open client");
    client.connect().expect("Failed to connect");
    let _accepted = server.accept().expect("Failed to accept");

    assert!(client.is_valid());
    client.close().expect("Failed to close");
    assert!(!client.is_valid());

    assert!(matches!(client.send(b"late", 0), Err(Error::InvalidHandle)));
    assert!(matches!(client.recv_vec(0), Err(Error::InvalidHandle)));
    assert!(matches!(client.connect(), Err(Error::InvalidHandle)));
}

#[test]
fn test_send_after_peer_close_fails() {
    let _ctx = NetworkContext::acquire().expect("Failed to init network context");

    let server = TcpServerBuilder::new()
        .address(InetAddress::LOOPBACK)
        .build()
        .expect("Failed to build server");
    let listen_host = server.local_host().expect("Failed to get local host");

    let client = TcpClient::new(listen_host).expect("Failed to open client");
    client.connect().expect("Failed to connect");
    let mut accepted = server.accept().expect("Failed to accept");
    accepted.close().expect("Failed to close");

    // The first send may still be accepted locally; keep sending until the
    // reset comes back.
    let mut failure = None;
    for _ in 0..50 {
        match client.send(b"data", 0) {
            Ok(_) => std::thread::sleep(Duration::from_millis(10)),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    let err = failure.expect("Send never failed after peer close");
    assert!(err.is_disconnect());
}

#[test]
fn test_udp_bind_and_receive() {
    let host = InetHost::parse_with_port("127.0.0.1", 0).expect("Failed to parse host");

    let receiver = UdpSocket::new().expect("Failed to open socket");
    receiver.bind_to(&host).expect("Failed to bind");
    let target = receiver.local_host().expect("Failed to get local host");

    let sender = UdpSocket::new().expect("Failed to open socket");
    sender
        .send_string_to("over udp", Some(&target), 0)
        .expect("Failed to send");

    let message = receiver.recv_string(0).expect("Failed to receive");
    assert_eq!(message, "over udp");
}

#[test]
fn test_diagnostic_output() {
    let mut out = Vec::new();
    write_last_error(&mut out).expect("Failed to write diagnostic");

    let text = String::from_utf8(out).expect("Diagnostic is not UTF-8");
    assert!(text.contains(" | "));
}

#[test]
fn test_host_round_trips() {
    for (octets, port) in [([127, 0, 0, 1], 4555u16), ([0, 0, 0, 0], 0), ([255, 1, 2, 3], 65535)] {
        let address = InetAddress::from(octets);
        let host = InetHost::with_address(address, port);
        assert_eq!(host.address(), address);
        assert_eq!(host.port(), port);

        let reparsed: InetAddress = address.to_string().parse().expect("Failed to reparse");
        assert_eq!(reparsed.octets(), octets);
    }
}
