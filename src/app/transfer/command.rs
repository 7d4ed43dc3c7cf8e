//! DIMSE command sets for C-STORE
//!
//! Command sets are always encoded in implicit VR little endian, whatever
//! transfer syntax the data set travels in.

use dicom_core::{dicom_value, DataElement, VR};
use dicom_dictionary_std::tags;
use dicom_object::InMemDicomObject;
use dicom_transfer_syntax_registry::entries;

use crate::app::transfer::status::StatusCode;
use crate::errors::{TransferError, TransferResult};

/// C-STORE-RQ command field
pub const C_STORE_RQ: u16 = 0x0001;

/// C-STORE-RSP command field
pub const C_STORE_RSP: u16 = 0x8001;

/// Command data set type meaning "a data set follows"
const DATA_SET_PRESENT: u16 = 0x0000;

/// Command data set type meaning "no data set"
const NO_DATA_SET: u16 = 0x0101;

/// Encode a C-STORE-RQ command set
pub fn store_request(
    sop_class_uid: &str,
    sop_instance_uid: &str,
    message_id: u16,
) -> TransferResult<Vec<u8>> {
    let command = InMemDicomObject::command_from_element_iter([
        DataElement::new(
            tags::AFFECTED_SOP_CLASS_UID,
            VR::UI,
            dicom_value!(Str, sop_class_uid),
        ),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [C_STORE_RQ])),
        DataElement::new(tags::MESSAGE_ID, VR::US, dicom_value!(U16, [message_id])),
        // medium priority
        DataElement::new(tags::PRIORITY, VR::US, dicom_value!(U16, [0x0000])),
        DataElement::new(
            tags::COMMAND_DATA_SET_TYPE,
            VR::US,
            dicom_value!(U16, [DATA_SET_PRESENT]),
        ),
        DataElement::new(
            tags::AFFECTED_SOP_INSTANCE_UID,
            VR::UI,
            dicom_value!(Str, sop_instance_uid),
        ),
    ]);

    encode(&command)
}

/// Encode a C-STORE-RSP command set, as a storage SCP would send it
pub fn store_response(
    sop_class_uid: &str,
    sop_instance_uid: &str,
    message_id: u16,
    status: StatusCode,
) -> TransferResult<Vec<u8>> {
    let command = InMemDicomObject::command_from_element_iter([
        DataElement::new(
            tags::AFFECTED_SOP_CLASS_UID,
            VR::UI,
            dicom_value!(Str, sop_class_uid),
        ),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [C_STORE_RSP])),
        DataElement::new(
            tags::MESSAGE_ID_BEING_RESPONDED_TO,
            VR::US,
            dicom_value!(U16, [message_id]),
        ),
        DataElement::new(
            tags::COMMAND_DATA_SET_TYPE,
            VR::US,
            dicom_value!(U16, [NO_DATA_SET]),
        ),
        DataElement::new(tags::STATUS, VR::US, dicom_value!(U16, [status.0])),
        DataElement::new(
            tags::AFFECTED_SOP_INSTANCE_UID,
            VR::UI,
            dicom_value!(Str, sop_instance_uid),
        ),
    ]);

    encode(&command)
}

/// Read the status out of a reply command set
///
/// # Errors
///
/// `MalformedReply` if the bytes do not decode, the command is not a
/// C-STORE-RSP, or the status element is missing or not an integer.
pub fn extract_status(command: &[u8]) -> TransferResult<StatusCode> {
    if command.is_empty() {
        return Err(malformed("empty command set"));
    }

    let object: InMemDicomObject = InMemDicomObject::read_dataset_with_ts(
        command,
        &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased(),
    )
    .map_err(|e| malformed(format!("cannot decode command set: {}", e)))?;

    if let Ok(field) = object.element(tags::COMMAND_FIELD) {
        let field = field
            .to_int::<u16>()
            .map_err(|e| malformed(format!("unreadable command field: {}", e)))?;
        if field != C_STORE_RSP {
            return Err(malformed(format!(
                "expected C-STORE-RSP, got command field 0x{:04X}",
                field
            )));
        }
    }

    let status = object
        .element(tags::STATUS)
        .map_err(|_| malformed("reply carries no status (0000,0900)"))?
        .to_int::<u16>()
        .map_err(|e| malformed(format!("unreadable status: {}", e)))?;

    Ok(StatusCode(status))
}

fn encode(command: &InMemDicomObject) -> TransferResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(128);
    command
        .write_dataset_with_ts(&mut bytes, &entries::IMPLICIT_VR_LITTLE_ENDIAN.erased())
        .map_err(|e| TransferError::Dataset {
            reason: format!("cannot encode command set: {}", e),
        })?;
    Ok(bytes)
}

fn malformed(reason: impl Into<String>) -> TransferError {
    TransferError::MalformedReply {
        reason: reason.into(),
    }
}
