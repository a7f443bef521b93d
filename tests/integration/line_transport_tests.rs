//! End-to-end over the JSON-lines transport: text in, dispatcher, text out.

use am335x_periph::adapters::sim_board::SimBoard;
use am335x_periph::error::Status;
use am335x_periph::rpc::dispatcher::Dispatcher;
use am335x_periph::rpc::transport::{LineTransport, LineTransportError, WireReply};
use am335x_periph::startup;

use crate::mock_hw::BADGE;

fn run_session(input: &str) -> Vec<WireReply> {
    run_session_bytes(input.as_bytes())
}

fn run_session_bytes(input: &[u8]) -> Vec<WireReply> {
    let mut board = SimBoard::am335x_gpio();
    let gpio = startup::bring_up_gpio(&mut board).unwrap();
    let mut dispatcher = Dispatcher::new(BADGE, gpio);
    let mut transport = LineTransport::new(input, Vec::new());

    let err = dispatcher.run(&mut transport);
    assert!(matches!(err, LineTransportError::Closed));

    let (_, output) = transport.into_inner();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn register_write_read_session() {
    let input = format!(
        "{{\"badge\":{BADGE},\"caller\":5,\"label\":4294967295}}\n\
         {{\"badge\":{BADGE},\"caller\":5,\"label\":1,\"payload\":[9,1]}}\n\
         {{\"badge\":{BADGE},\"caller\":5,\"label\":5,\"payload\":[9,1]}}\n\
         {{\"badge\":{BADGE},\"caller\":5,\"label\":4,\"payload\":[9]}}\n"
    );
    let replies = run_session(&input);
    assert_eq!(replies.len(), 4);

    let token = replies[0].token.expect("registration returns a token");
    assert_eq!(token.badge, BADGE);
    assert_eq!(replies[0].metadata >> 16, u32::from(token.slot));

    assert!(replies.iter().all(|r| r.status == Status::Ok && r.code == 0));
    assert_eq!(replies[3].payload, vec![1]);
    assert_eq!(replies[3].metadata & 0xFFFF, 4);
}

#[test]
fn rejected_requests_get_status_codes() {
    let input = format!(
        "{{\"badge\":{BADGE},\"caller\":5,\"label\":1,\"payload\":[9,1]}}\n\
         garbage\n\
         {{\"badge\":{BADGE},\"caller\":5,\"label\":4294967295}}\n\
         {{\"badge\":{BADGE},\"caller\":6,\"label\":4294967295}}\n\
         {{\"badge\":{BADGE},\"caller\":5,\"label\":4,\"payload\":[9],\"payload_bytes\":8}}\n"
    );
    let codes: Vec<Status> = run_session(&input).iter().map(|r| r.status).collect();
    assert_eq!(
        codes,
        vec![
            Status::Unauthorized,
            Status::BadRequest,
            Status::Ok,
            Status::Full,
            Status::BadRequest,
        ]
    );
}

#[test]
fn declared_size_above_sixteen_bits_is_bad_request() {
    let input = format!(
        "{{\"badge\":{BADGE},\"caller\":5,\"label\":4294967295}}\n\
         {{\"badge\":{BADGE},\"caller\":5,\"label\":1,\"payload\":[9,1],\"payload_bytes\":65544}}\n\
         {{\"badge\":{BADGE},\"caller\":5,\"label\":1,\"payload\":[9,1]}}\n"
    );
    let codes: Vec<Status> = run_session(&input).iter().map(|r| r.status).collect();
    assert_eq!(codes, vec![Status::Ok, Status::BadRequest, Status::Ok]);
}

#[test]
fn invalid_utf8_does_not_stop_the_server() {
    let mut input = format!("{{\"badge\":{BADGE},\"caller\":5,\"label\":4294967295}}\n").into_bytes();
    input.extend_from_slice(b"\xff\xfe\n");
    input.extend_from_slice(
        format!("{{\"badge\":{BADGE},\"caller\":5,\"label\":4,\"payload\":[9]}}\n").as_bytes(),
    );
    let replies = run_session_bytes(&input);
    let codes: Vec<Status> = replies.iter().map(|r| r.status).collect();
    assert_eq!(codes, vec![Status::Ok, Status::BadRequest, Status::Ok]);
    assert_eq!(replies[2].payload, vec![0]);
}
