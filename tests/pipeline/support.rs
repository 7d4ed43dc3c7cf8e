//! Fixtures shared by the pipeline scenarios

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use dicom_bridge::app::transfer::command;
use dicom_bridge::app::{BridgeConfig, RouterConfig, StatusCode, StoreReply, StoreTransport};
use dicom_bridge::app::{ToolsConfig, TransferConfig};
use dicom_bridge::errors::{TransferError, TransferResult};
use dicom_core::{dicom_value, DataElement, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use tempfile::TempDir;

pub const INSTANCE_UID: &str = "2.25.113059749145936325402354257176981405696";

/// Scratch layout for one scenario: source dir, temp dir for working copies, tool dir
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["source", "scratch", "bin"] {
            std::fs::create_dir(root.path().join(dir)).unwrap();
        }
        Self { root }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.path().join("source")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.root.path().join("scratch")
    }

    pub fn args_record(&self) -> PathBuf {
        self.root.path().join("dcmodify-args.txt")
    }

    /// Install an executable shell script under `bin/`
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root.path().join("bin").join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// dcmdump stand-in that accepts every file
    pub fn accepting_dcmdump(&self) -> PathBuf {
        self.script("dcmdump", "exit 0")
    }

    /// dcmodify stand-in that records one argument per line and succeeds
    pub fn recording_dcmodify(&self) -> PathBuf {
        let record = self.args_record();
        self.script(
            "dcmodify",
            &format!(
                "for a in \"$@\"; do echo \"$a\" >> '{}'; done\nexit 0",
                record.display()
            ),
        )
    }

    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.args_record())
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Files currently in the working copy directory
    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch_dir())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    pub fn config(
        &self,
        dcmdump: PathBuf,
        dcmodify: PathBuf,
        reply_timeout: Duration,
    ) -> BridgeConfig {
        BridgeConfig {
            router: RouterConfig::default(),
            tools: ToolsConfig {
                dcmdump,
                dcmodify,
                validation_timeout: Duration::from_secs(10),
                modify_timeout: Duration::from_secs(10),
            },
            transfer: TransferConfig {
                reply_timeout,
                temp_dir: self.scratch_dir(),
                ..TransferConfig::default()
            },
        }
    }

    /// Write a small CT image as `source/<name>`
    pub fn dicom_source(&self, name: &str) -> PathBuf {
        let path = self.source_dir().join(name);
        write_dicom(&path);
        path
    }
}

pub fn write_dicom(path: &Path) {
    let object = InMemDicomObject::from_element_iter([
        DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            dicom_value!(Str, uids::CT_IMAGE_STORAGE),
        ),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, dicom_value!(Str, INSTANCE_UID)),
        DataElement::new(tags::PATIENT_NAME, VR::PN, dicom_value!(Str, "Doe^John")),
        DataElement::new(tags::MODALITY, VR::CS, dicom_value!(Str, "CT")),
    ]);
    object
        .with_meta(
            FileMetaTableBuilder::new()
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(INSTANCE_UID)
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN),
        )
        .unwrap()
        .write_to_file(path)
        .unwrap();
}

/// What the transport saw for one store call
#[derive(Debug, Clone)]
pub struct SeenCopy {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Transport that reads the working copy and answers with a fixed status
pub struct RecordingTransport {
    status: u16,
    pub seen: Mutex<Vec<SeenCopy>>,
}

impl RecordingTransport {
    pub fn replying(status: u16) -> Self {
        Self {
            status,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<SeenCopy> {
        self.seen.lock().unwrap().clone()
    }
}

impl StoreTransport for RecordingTransport {
    async fn store(&self, file: &Path, _router: &RouterConfig) -> TransferResult<StoreReply> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;
        self.seen.lock().unwrap().push(SeenCopy {
            path: file.to_path_buf(),
            bytes,
        });

        let command = command::store_response(
            uids::CT_IMAGE_STORAGE,
            INSTANCE_UID,
            1,
            StatusCode(self.status),
        )?;
        Ok(StoreReply {
            command,
            released: true,
        })
    }
}
