//! Tests for the transfer client and the DIMSE transport
//!
//! Scripted transports cover the deadline race; the DIMSE transport is run
//! against a real `dicom-ul` SCP, an SCP that takes the data set and never
//! answers, and a peer that accepts TCP but never speaks.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dicom_core::{dicom_value, DataElement, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use dicom_ul::pdu::{PDataValue, PDataValueType, Pdu};
use dicom_ul::ServerAssociationOptions;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use super::*;
use crate::app::log::{LogLevel, MemoryLog};

const INSTANCE_UID: &str = "2.25.302155328712960149374624418466452183093";

/// What a scripted transport does when asked to store
enum Script {
    Reply(Vec<u8>),
    Fail(&'static str),
    Hang,
}

struct ScriptedTransport {
    script: Script,
    calls: AtomicUsize,
    dropped: Arc<AtomicBool>,
}

impl ScriptedTransport {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Flags when the in-flight store future is torn down
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl StoreTransport for ScriptedTransport {
    async fn store(&self, _file: &Path, _router: &RouterConfig) -> TransferResult<StoreReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _guard = DropFlag(self.dropped.clone());
        match &self.script {
            Script::Reply(command) => Ok(StoreReply {
                command: command.clone(),
                released: true,
            }),
            Script::Fail(message) => Err(TransferError::Network(message.to_string())),
            Script::Hang => std::future::pending().await,
        }
    }
}

fn response(status: u16) -> Vec<u8> {
    command::store_response(uids::CT_IMAGE_STORAGE, INSTANCE_UID, 1, StatusCode(status)).unwrap()
}

fn router_at(addr: SocketAddr) -> RouterConfig {
    RouterConfig {
        router_ip: addr.ip().to_string(),
        router_port: addr.port(),
        router_ae: "ROUTER".to_string(),
        my_ae: "BRIDGE".to_string(),
    }
}

/// Minimal CT image file in explicit VR little endian
fn write_test_dicom(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("study.dcm");
    let object = InMemDicomObject::from_element_iter([
        DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            dicom_value!(Str, uids::CT_IMAGE_STORAGE),
        ),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, dicom_value!(Str, INSTANCE_UID)),
        DataElement::new(tags::PATIENT_NAME, VR::PN, dicom_value!(Str, "Doe^Jane")),
        DataElement::new(tags::ACCESSION_NUMBER, VR::SH, dicom_value!(Str, "A1234")),
        DataElement::new(tags::MODALITY, VR::CS, dicom_value!(Str, "CT")),
    ]);
    let file = object
        .with_meta(
            FileMetaTableBuilder::new()
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(INSTANCE_UID)
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN),
        )
        .unwrap();
    file.write_to_file(&path).unwrap();
    path
}

/// Storage SCP answering one C-STORE with `status`; yields the data set bytes it got
fn spawn_scp(status: u16) -> (SocketAddr, std::thread::JoinHandle<Vec<u8>>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut association = ServerAssociationOptions::new()
            .accept_any()
            .ae_title("ROUTER")
            .with_abstract_syntax(uids::CT_IMAGE_STORAGE)
            .establish(stream)
            .unwrap();

        let mut dataset = Vec::new();
        let mut context_id = 0;
        let mut complete = false;
        while !complete {
            match association.receive().unwrap() {
                Pdu::PData { data } => {
                    for value in data {
                        context_id = value.presentation_context_id;
                        if matches!(value.value_type, PDataValueType::Data) {
                            dataset.extend_from_slice(&value.data);
                            complete |= value.is_last;
                        }
                    }
                }
                other => panic!("unexpected PDU {:?}", other),
            }
        }

        association
            .send(&Pdu::PData {
                data: vec![PDataValue {
                    presentation_context_id: context_id,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: response(status),
                }],
            })
            .unwrap();

        if let Ok(Pdu::ReleaseRQ) = association.receive() {
            let _ = association.send(&Pdu::ReleaseRP);
        }

        dataset
    });

    (addr, handle)
}

/// What the mute SCP observed after it stopped answering
struct MuteReport {
    dataset_len: usize,
    peer_closed: bool,
    waited: Duration,
}

/// SCP that accepts the association and the whole data set, then never replies
fn spawn_mute_scp() -> (SocketAddr, std::thread::JoinHandle<MuteReport>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut association = ServerAssociationOptions::new()
            .accept_any()
            .ae_title("ROUTER")
            .with_abstract_syntax(uids::CT_IMAGE_STORAGE)
            .timeout(Duration::from_secs(10))
            .establish(stream)
            .unwrap();

        let mut dataset_len = 0;
        let mut complete = false;
        while !complete {
            if let Pdu::PData { data } = association.receive().unwrap() {
                for value in data {
                    if matches!(value.value_type, PDataValueType::Data) {
                        dataset_len += value.data.len();
                        complete |= value.is_last;
                    }
                }
            }
        }

        // Stay silent and wait for the client to give up
        let started = Instant::now();
        let peer_closed = matches!(association.receive(), Err(_) | Ok(Pdu::AbortRQ { .. }));
        MuteReport {
            dataset_len,
            peer_closed,
            waited: started.elapsed(),
        }
    });

    (addr, handle)
}

async fn mute_router_is_cut_off_at_deadline() {
    let dir = TempDir::new().unwrap();
    let file = write_test_dicom(&dir);
    let (addr, scp) = spawn_mute_scp();

    // Socket timeouts stay long so only the deadline can end the exchange
    let client = TransferClient::new(
        DimseTransport::default(),
        Duration::from_millis(500),
        Arc::new(MemoryLog::new()),
    );

    let started = Instant::now();
    let outcome = client.send(&file, &router_at(addr)).await;
    let elapsed = started.elapsed();

    assert!(!outcome.success);
    assert_eq!(
        outcome.message,
        "DICOM Processing/Network Error: C-STORE request timed out after 500 milliseconds"
    );
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_secs(2), "deadline overrun: {:?}", elapsed);

    let report = tokio::task::spawn_blocking(move || scp.join().unwrap())
        .await
        .unwrap();
    assert!(report.dataset_len > 0);
    assert!(report.peer_closed);
    assert!(report.waited < Duration::from_secs(3), "{:?}", report.waited);
}

#[tokio::test]
async fn test_mute_router_is_cut_off_at_deadline() {
    mute_router_is_cut_off_at_deadline().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mute_router_is_cut_off_at_deadline_multi_thread() {
    mute_router_is_cut_off_at_deadline().await;
}

#[tokio::test]
async fn test_success_reply() {
    let log = Arc::new(MemoryLog::new());
    let client = TransferClient::new(
        ScriptedTransport::new(Script::Reply(response(0))),
        Duration::from_secs(5),
        log.clone(),
    );

    let outcome = client
        .send(Path::new("copy.dcm"), &RouterConfig::default())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.message, "DICOM successfully stored on Router.");
    assert!(log.contains(LogLevel::Debug, "DICOM association closed."));
    assert!(log.contains(LogLevel::Info, "Starting C-STORE request for file: copy.dcm"));
}

#[tokio::test]
async fn test_failure_status_is_rendered_in_hex() {
    let client = TransferClient::new(
        ScriptedTransport::new(Script::Reply(response(42))),
        Duration::from_secs(5),
        Arc::new(MemoryLog::new()),
    );

    let outcome = client
        .send(Path::new("copy.dcm"), &RouterConfig::default())
        .await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("0x002A"), "{}", outcome.message);
}

#[tokio::test]
async fn test_malformed_reply_is_a_failed_store() {
    let client = TransferClient::new(
        ScriptedTransport::new(Script::Reply(vec![0xde, 0xad, 0xbe, 0xef])),
        Duration::from_secs(5),
        Arc::new(MemoryLog::new()),
    );

    let err = client
        .exchange(Path::new("copy.dcm"), &RouterConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::MalformedReply { .. }));

    let outcome = client
        .send(Path::new("copy.dcm"), &RouterConfig::default())
        .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("Malformed C-STORE reply"));
}

#[tokio::test]
async fn test_network_error_text_is_kept() {
    let client = TransferClient::new(
        ScriptedTransport::new(Script::Fail("connection reset by peer")),
        Duration::from_secs(5),
        Arc::new(MemoryLog::new()),
    );

    let outcome = client
        .send(Path::new("copy.dcm"), &RouterConfig::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.message,
        "DICOM Processing/Network Error: connection reset by peer"
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_fires_at_thirty_seconds() {
    let transport = ScriptedTransport::new(Script::Hang);
    let dropped = transport.dropped.clone();
    let client = TransferClient::new(
        transport,
        transfer::REPLY_TIMEOUT,
        Arc::new(MemoryLog::new()),
    );

    let started = tokio::time::Instant::now();
    let outcome = client
        .send(Path::new("copy.dcm"), &RouterConfig::default())
        .await;
    let elapsed = started.elapsed();

    assert!(!outcome.success);
    assert!(outcome.message.contains("timed out after 30 seconds"));
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed < Duration::from_secs(31));

    // The losing store future was torn down and was only ever started once
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_early_reply_wins_the_race() {
    let client = TransferClient::new(
        ScriptedTransport::new(Script::Reply(response(0))),
        Duration::from_secs(30),
        Arc::new(MemoryLog::new()),
    );

    let started = tokio::time::Instant::now();
    let status = client
        .exchange(Path::new("copy.dcm"), &RouterConfig::default())
        .await
        .unwrap();

    assert_eq!(status, StatusCode::SUCCESS);
    assert!(started.elapsed() < Duration::from_secs(1));

    // Nothing left behind fires once the deadline would have passed
    tokio::time::sleep(Duration::from_secs(60)).await;
}

#[tokio::test]
async fn test_dimse_store_against_scp() {
    let dir = TempDir::new().unwrap();
    let file = write_test_dicom(&dir);
    let (addr, scp) = spawn_scp(0x0000);

    let client = TransferClient::new(
        DimseTransport::default(),
        Duration::from_secs(10),
        Arc::new(MemoryLog::new()),
    );
    let outcome = client.send(&file, &router_at(addr)).await;

    assert!(outcome.success, "{}", outcome.message);

    let received = scp.join().unwrap();
    let expected = dimse::StoreRequest::load(&file).unwrap().dataset;
    assert_eq!(received, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dimse_store_against_scp_multi_thread() {
    let dir = TempDir::new().unwrap();
    let file = write_test_dicom(&dir);
    let (addr, scp) = spawn_scp(0x0000);

    let client = TransferClient::new(
        DimseTransport::default(),
        Duration::from_secs(10),
        Arc::new(MemoryLog::new()),
    );
    let outcome = client.send(&file, &router_at(addr)).await;

    assert!(outcome.success, "{}", outcome.message);
    assert!(!scp.join().unwrap().is_empty());
}

#[tokio::test]
async fn test_dimse_refusal_status() {
    let dir = TempDir::new().unwrap();
    let file = write_test_dicom(&dir);
    let (addr, scp) = spawn_scp(0xA700);

    let client = TransferClient::new(
        DimseTransport::default(),
        Duration::from_secs(10),
        Arc::new(MemoryLog::new()),
    );
    let outcome = client.send(&file, &router_at(addr)).await;
    scp.join().unwrap();

    assert!(!outcome.success);
    assert_eq!(
        outcome.message,
        "C-STORE Failed: 0xA700 - Refused: Out of resources"
    );
}

#[tokio::test]
async fn test_dimse_connection_refused() {
    let dir = TempDir::new().unwrap();
    let file = write_test_dicom(&dir);

    // Grab a free port, then close it again
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let client = TransferClient::new(
        DimseTransport::default(),
        Duration::from_secs(10),
        Arc::new(MemoryLog::new()),
    );
    let err = client.exchange(&file, &router_at(addr)).await.unwrap_err();

    assert!(matches!(err, TransferError::Network(_)), "{:?}", err);
}

#[tokio::test]
async fn test_dimse_silent_peer_times_out_and_is_disconnected() {
    let dir = TempDir::new().unwrap();
    let file = write_test_dicom(&dir);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let peer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Swallow the association request and never answer
        let mut buf = vec![0u8; 4096];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    });

    // The handshake itself is bounded by the socket timeouts
    let client = TransferClient::new(
        DimseTransport::default().with_io_timeout(Duration::from_secs(1)),
        Duration::from_millis(300),
        Arc::new(MemoryLog::new()),
    );
    let outcome = client.send(&file, &router_at(addr)).await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("timed out after 300 milliseconds"));

    // The peer sees the connection go away once the deadline drops the association
    tokio::time::timeout(Duration::from_secs(5), peer)
        .await
        .expect("association was not closed after the timeout")
        .unwrap();
}

#[tokio::test]
async fn test_dimse_non_dicom_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("broken.dcm");
    std::fs::write(&file, b"this is not DICOM").unwrap();

    let client = TransferClient::new(
        DimseTransport::default(),
        Duration::from_secs(5),
        Arc::new(MemoryLog::new()),
    );
    let err = client
        .exchange(&file, &RouterConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Dataset { .. }));
}
