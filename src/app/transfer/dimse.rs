//! C-STORE over the DICOM upper layer protocol
//!
//! One association per call: propose a single presentation context matching
//! the file's SOP class and transfer syntax, send the command set, stream the
//! data set in P-DATA fragments, wait for the C-STORE-RSP, then release.
//!
//! The exchange runs on the blocking pool with the synchronous `dicom-ul`
//! client, so it behaves the same on current-thread and multi-thread
//! runtimes. Every socket operation is bounded by the I/O timeout, and when
//! the caller abandons the store future the socket is shut down at once.

use std::net::{Shutdown, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dicom_encoding::TransferSyntaxIndex;
use dicom_transfer_syntax_registry::TransferSyntaxRegistry;
use dicom_ul::pdu::{PDataValue, PDataValueType, Pdu};
use dicom_ul::{ClientAssociation, ClientAssociationOptions};
use tracing::{debug, warn};

use crate::app::models::RouterConfig;
use crate::app::transfer::command;
use crate::app::transfer::{StoreReply, StoreTransport};
use crate::constants::transfer;
use crate::errors::{TransferError, TransferResult};

/// Production [`StoreTransport`] backed by `dicom-ul`
#[derive(Debug, Clone)]
pub struct DimseTransport {
    max_pdu_length: u32,
    io_timeout: Duration,
}

impl Default for DimseTransport {
    fn default() -> Self {
        Self::new(transfer::DEFAULT_MAX_PDU_LENGTH)
    }
}

impl DimseTransport {
    pub fn new(max_pdu_length: u32) -> Self {
        Self {
            max_pdu_length,
            io_timeout: transfer::REPLY_TIMEOUT,
        }
    }

    /// Bound connect, every read and every write on the association socket
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Blocking half of [`StoreTransport::store`]
    fn exchange(
        &self,
        router: &RouterConfig,
        request: StoreRequest,
        socket: &SocketSlot,
    ) -> TransferResult<StoreReply> {
        let mut association = ClientAssociationOptions::new()
            .calling_ae_title(router.my_ae.clone())
            .called_ae_title(router.router_ae.clone())
            .max_pdu_length(self.max_pdu_length)
            .with_presentation_context(
                request.sop_class_uid.clone(),
                vec![request.transfer_syntax_uid.clone()],
            )
            .connection_timeout(self.io_timeout)
            .read_timeout(self.io_timeout)
            .write_timeout(self.io_timeout)
            .establish_with(&router.ae_address())
            .map_err(network_error)?;

        let handle = association
            .inner_stream()
            .try_clone()
            .map_err(network_error)?;
        if !socket.register(handle) {
            return Err(TransferError::Network(
                "Store abandoned before the request was sent".to_string(),
            ));
        }

        match send_and_receive(&mut association, request) {
            Ok(command) => {
                let released = match association.release() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Association release failed: {}", e);
                        false
                    }
                };
                Ok(StoreReply { command, released })
            }
            Err(e) => {
                if let Err(abort) = association.abort() {
                    debug!("Association abort failed: {}", abort);
                }
                Err(e)
            }
        }
    }
}

/// Everything needed to put one file on the wire
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub transfer_syntax_uid: String,
    /// Encoded C-STORE-RQ command set
    pub command: Vec<u8>,
    /// Data set encoded in `transfer_syntax_uid`, without preamble or meta group
    pub dataset: Vec<u8>,
}

impl StoreRequest {
    /// Read `path` and encode it for sending
    ///
    /// # Errors
    ///
    /// `TransferError::Dataset` if the file is not a readable DICOM file or
    /// uses a transfer syntax this build cannot encode.
    pub fn load(path: &Path) -> TransferResult<Self> {
        let file = dicom_object::open_file(path).map_err(|e| dataset_error(path, e))?;

        let meta = file.meta();
        let sop_class_uid = trim_uid(&meta.media_storage_sop_class_uid);
        let sop_instance_uid = trim_uid(&meta.media_storage_sop_instance_uid);
        let transfer_syntax_uid = trim_uid(&meta.transfer_syntax);

        let ts = TransferSyntaxRegistry
            .get(&transfer_syntax_uid)
            .ok_or_else(|| TransferError::Dataset {
                reason: format!("unsupported transfer syntax {}", transfer_syntax_uid),
            })?;

        let mut dataset = Vec::new();
        file.write_dataset_with_ts(&mut dataset, ts)
            .map_err(|e| dataset_error(path, e))?;

        let command =
            command::store_request(&sop_class_uid, &sop_instance_uid, transfer::MESSAGE_ID)?;

        Ok(Self {
            sop_class_uid,
            sop_instance_uid,
            transfer_syntax_uid,
            command,
            dataset,
        })
    }
}

impl StoreTransport for DimseTransport {
    async fn store(&self, file: &Path, router: &RouterConfig) -> TransferResult<StoreReply> {
        let path: PathBuf = file.to_path_buf();
        let request = tokio::task::spawn_blocking(move || StoreRequest::load(&path))
            .await
            .map_err(|e| TransferError::Dataset {
                reason: format!("loading task failed: {}", e),
            })??;

        debug!(
            "Store request: SOP class {}, instance {}, transfer syntax {}",
            request.sop_class_uid, request.sop_instance_uid, request.transfer_syntax_uid
        );

        let socket = Arc::new(SocketSlot::default());
        let _shutdown = ShutdownOnDrop(socket.clone());

        let transport = self.clone();
        let router = router.clone();
        tokio::task::spawn_blocking(move || transport.exchange(&router, request, &socket))
            .await
            .map_err(|e| TransferError::Network(format!("store task failed: {}", e)))?
    }
}

/// Send the command and data set, then collect the C-STORE-RSP command bytes
fn send_and_receive(
    association: &mut ClientAssociation<TcpStream>,
    request: StoreRequest,
) -> TransferResult<Vec<u8>> {
    let context_id = association
        .presentation_contexts()
        .iter()
        .find(|pc| trim_uid(&pc.transfer_syntax) == request.transfer_syntax_uid)
        .map(|pc| pc.id)
        .ok_or_else(|| TransferError::Rejected {
            context: format!(
                "{} in {}",
                request.sop_class_uid, request.transfer_syntax_uid
            ),
        })?;

    association
        .send(&Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: context_id,
                value_type: PDataValueType::Command,
                is_last: true,
                data: request.command,
            }],
        })
        .map_err(network_error)?;

    let fragment = fragment_size(association.acceptor_max_pdu_length());
    for (data, is_last) in fragments(&request.dataset, fragment) {
        association
            .send(&Pdu::PData {
                data: vec![PDataValue {
                    presentation_context_id: context_id,
                    value_type: PDataValueType::Data,
                    is_last,
                    data: data.to_vec(),
                }],
            })
            .map_err(network_error)?;
    }

    let mut command = Vec::new();
    loop {
        match association.receive().map_err(network_error)? {
            Pdu::PData { data } => {
                let mut complete = false;
                for value in data {
                    if matches!(value.value_type, PDataValueType::Command) {
                        command.extend_from_slice(&value.data);
                        complete |= value.is_last;
                    }
                }
                if complete {
                    return Ok(command);
                }
            }
            Pdu::AbortRQ { .. } => {
                return Err(TransferError::Network(
                    "Association aborted by router".to_string(),
                ));
            }
            Pdu::ReleaseRQ => {
                return Err(TransferError::MalformedReply {
                    reason: "router released the association without replying".to_string(),
                });
            }
            _ => {
                return Err(TransferError::MalformedReply {
                    reason: "unexpected PDU while waiting for C-STORE-RSP".to_string(),
                });
            }
        }
    }
}

/// Second handle on the association socket
///
/// Once shut down, any handle registered later is shut down on arrival.
#[derive(Debug, Default)]
struct SocketSlot {
    state: Mutex<SlotState>,
}

#[derive(Debug, Default)]
struct SlotState {
    stream: Option<TcpStream>,
    shut_down: bool,
}

impl SocketSlot {
    /// Keep `stream` for a later shutdown; `false` if the slot was already shut down
    fn register(&self, stream: TcpStream) -> bool {
        let mut state = self.lock();
        if state.shut_down {
            let _ = stream.shutdown(Shutdown::Both);
            return false;
        }
        state.stream = Some(stream);
        true
    }

    fn shutdown(&self) {
        let mut state = self.lock();
        state.shut_down = true;
        if let Some(stream) = state.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shuts the association socket down when the store future goes away
struct ShutdownOnDrop(Arc<SocketSlot>);

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// Largest PDV payload that fits the acceptor's maximum PDU length
fn fragment_size(acceptor_max_pdu_length: u32) -> usize {
    let max = if acceptor_max_pdu_length == 0 {
        transfer::DEFAULT_MAX_PDU_LENGTH
    } else {
        acceptor_max_pdu_length
    };
    max.saturating_sub(transfer::PDV_HEADER_LEN).max(1) as usize
}

/// Split `data` into `(chunk, is_last)` pairs; always yields at least one
fn fragments(data: &[u8], size: usize) -> Vec<(&[u8], bool)> {
    if data.is_empty() {
        return vec![(data, true)];
    }
    let count = data.len().div_ceil(size);
    data.chunks(size)
        .enumerate()
        .map(|(i, chunk)| (chunk, i + 1 == count))
        .collect()
}

fn trim_uid(uid: &str) -> String {
    uid.trim_end_matches(['\0', ' ']).to_string()
}

fn dataset_error(path: &Path, e: impl std::fmt::Display) -> TransferError {
    TransferError::Dataset {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn network_error(e: impl std::fmt::Display) -> TransferError {
    TransferError::Network(e.to_string())
}
