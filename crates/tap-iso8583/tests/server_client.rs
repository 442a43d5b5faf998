//! End-to-end exchange over real sockets

use std::sync::Arc;

use async_trait::async_trait;
use tap_iso8583::spec::{auth_spec, fields};
use tap_iso8583::{
    approval, Client, Iso8583Error, Message, MessageHandler, Server, MTI_AUTHORIZATION_REQUEST,
    MTI_AUTHORIZATION_RESPONSE,
};

/// Approves everything and echoes the STAN as the authorization code
struct StubIssuer;

#[async_trait]
impl MessageHandler for StubIssuer {
    async fn handle(&self, request: Message) -> Result<Message, Iso8583Error> {
        assert_eq!(request.mti, MTI_AUTHORIZATION_REQUEST);

        let stan = request.get(fields::STAN).unwrap_or("000000").to_string();

        let mut response = Message::new(MTI_AUTHORIZATION_RESPONSE);
        response
            .set(fields::APPROVAL_CODE, approval::APPROVED)
            .set(fields::AUTHORIZATION_CODE, stan);
        Ok(response)
    }
}

fn request(stan: &str) -> Message {
    let mut message = Message::new(MTI_AUTHORIZATION_REQUEST);
    message
        .set(fields::PAN, "4111111111111111")
        .set(fields::AMOUNT, "1234")
        .set(fields::CURRENCY, "840")
        .set_subfield(fields::ACCEPTOR_INFO, "01", "Coffee Stand")
        .set(fields::STAN, stan);
    message
}

#[tokio::test]
async fn test_request_reply_over_tcp() {
    let server = Server::start("127.0.0.1:0", auth_spec(), Arc::new(StubIssuer))
        .await
        .unwrap();
    let addr = server.local_addr().to_string();

    let mut client = Client::connect(&addr, auth_spec()).await.unwrap();

    let response = client.request(&request("000001")).await.unwrap();
    assert_eq!(response.mti, MTI_AUTHORIZATION_RESPONSE);
    assert_eq!(response.get(fields::APPROVAL_CODE), Some("00"));
    assert_eq!(response.get(fields::AUTHORIZATION_CODE), Some("000001"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_replies_in_order_on_one_connection() {
    let server = Server::start("127.0.0.1:0", auth_spec(), Arc::new(StubIssuer))
        .await
        .unwrap();
    let addr = server.local_addr().to_string();

    let mut client = Client::connect(&addr, auth_spec()).await.unwrap();

    for stan in ["000001", "000002", "000003"] {
        let response = client.request(&request(stan)).await.unwrap();
        assert_eq!(response.get(fields::AUTHORIZATION_CODE), Some(stan));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let server = Server::start("127.0.0.1:0", auth_spec(), Arc::new(StubIssuer))
        .await
        .unwrap();
    let addr = server.local_addr().to_string();

    let mut client = Client::connect(&addr, auth_spec()).await.unwrap();
    client.request(&request("000001")).await.unwrap();

    server.shutdown().await;

    // the drained connection no longer answers
    let err = client.request(&request("000002")).await;
    assert!(err.is_err());
}
