//! DICOM upper-layer client adapter and authored initial seed.
//!
//! Call names mirror the original corpus's `pynetdicom` association methods
//! (`send_c_echo`/`send_c_store`/`send_c_find`/`send_c_get`/`send_c_move`/
//! `send_c_cancel`/`release`). The association itself is established with
//! `dicom-ul`; DIMSE command datasets are built with `dicom-object`/
//! `dicom-core`. As in the original, the DICOM dataset argument's `mutate`
//! stays a no-op — structural mutation of a DICOM dataset is unimplemented,
//! deliberately (spec §9).

use std::net::SocketAddrV4;

use dicom_core::header::{DataElement, Tag, VR};
use dicom_core::value::PrimitiveValue;
use dicom_object::InMemDicomObject;
use dicom_ul::association::client::ClientAssociationOptions;
use dicom_ul::pdu::{PDataValue, PDataValueType, Pdu};
use fazz_core::argument::{RecordMutation, UnpackedValue};
use fazz_core::call::Call;
use fazz_core::client::{Client, ClientCallError};
use fazz_core::seed::Seed;
use fazz_core::Argument;
use serde_json::json;
use tracing::debug;

const CALLING_AE: &str = "FAZZ";
const CALLED_AE: &str = "ANY-SCP";
const VERIFICATION_SOP_CLASS: &str = "1.2.840.10008.1.1";
const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";

/// An established DICOM upper-layer association. The PDV payloads sent for
/// each DIMSE-C operation are minimal command sets; this adapter exercises
/// the association state machine and command dispatch, not full dataset
/// transfer semantics (out of scope per spec §1: "the core does not parse
/// wire protocols itself").
pub struct DicomClient {
    association: dicom_ul::association::client::ClientAssociation,
    message_id: u16,
}

impl DicomClient {
    pub fn connect(addr: SocketAddrV4) -> anyhow::Result<Self> {
        debug!(%addr, calling_ae = CALLING_AE, called_ae = CALLED_AE, "establishing DICOM association");
        let association = ClientAssociationOptions::new()
            .calling_ae_title(CALLING_AE)
            .called_ae_title(CALLED_AE)
            .with_presentation_context(VERIFICATION_SOP_CLASS, vec![IMPLICIT_VR_LITTLE_ENDIAN])
            .establish_with(&addr.to_string())?;
        Ok(Self {
            association,
            message_id: 0,
        })
    }

    fn next_message_id(&mut self) -> u16 {
        self.message_id += 1;
        self.message_id
    }

    /// Sends a minimal DIMSE command dataset as a single P-DATA-TF PDU on
    /// presentation context 1, ignoring the wire-level response payload
    /// beyond "did the association stay alive".
    fn send_command(&mut self, command: InMemDicomObject) -> anyhow::Result<()> {
        let mut buffer = Vec::new();
        command.write_all(&mut buffer)?;
        let pdu = Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: 1,
                value_type: PDataValueType::Command,
                is_last: true,
                data: buffer,
            }],
        };
        self.association.send(&pdu)?;
        self.association.receive()?;
        Ok(())
    }

    fn c_echo_command(&mut self) -> InMemDicomObject {
        let message_id = self.next_message_id();
        command_dataset(0x0030, message_id, VERIFICATION_SOP_CLASS)
    }
}

/// Builds a minimal DIMSE-C command group: affected SOP class UID, the
/// command field (`0x0030` = C-ECHO-RQ, `0x0001` = C-STORE-RQ, `0x0020` =
/// C-FIND-RQ, `0x0010` = C-GET-RQ, `0x0021` = C-MOVE-RQ, `0x0FFF` =
/// C-CANCEL-RQ), and the message ID.
fn command_dataset(command_field: u16, message_id: u16, sop_class_uid: &str) -> InMemDicomObject {
    let mut object = InMemDicomObject::new_empty();
    object.put(DataElement::new(
        Tag(0x0000, 0x0002),
        VR::UI,
        PrimitiveValue::from(sop_class_uid.to_owned()),
    ));
    object.put(DataElement::new(
        Tag(0x0000, 0x0100),
        VR::US,
        PrimitiveValue::from(command_field),
    ));
    object.put(DataElement::new(
        Tag(0x0000, 0x0110),
        VR::US,
        PrimitiveValue::from(message_id),
    ));
    object
}

fn expect_record<'a>(args: &'a [UnpackedValue], index: usize) -> anyhow::Result<&'a serde_json::Value> {
    match args.get(index) {
        Some(UnpackedValue::Record(record)) => Ok(&record.value),
        other => anyhow::bail!("expected DICOM dataset record at position {index}, got {other:?}"),
    }
}

fn expect_enum(args: &[UnpackedValue], index: usize) -> anyhow::Result<&str> {
    match args.get(index) {
        Some(UnpackedValue::Enum(member)) => Ok(member.as_str()),
        other => anyhow::bail!("expected enum argument at position {index}, got {other:?}"),
    }
}

impl Client for DicomClient {
    fn invoke(&mut self, name: &str, args: Vec<UnpackedValue>) -> Option<Result<(), ClientCallError>> {
        let result = (|| -> anyhow::Result<()> {
            match name {
                "send_c_echo" => {
                    let command = self.c_echo_command();
                    self.send_command(command)?;
                }
                "send_c_store" => {
                    let _dataset = expect_record(&args, 0)?;
                    let message_id = self.next_message_id();
                    let command = command_dataset(0x0001, message_id, VERIFICATION_SOP_CLASS);
                    self.send_command(command)?;
                }
                "send_c_find" => {
                    let _dataset = expect_record(&args, 0)?;
                    let sop_class = expect_enum(&args, 1)?;
                    let message_id = self.next_message_id();
                    let command = command_dataset(0x0020, message_id, sop_class);
                    self.send_command(command)?;
                }
                "send_c_get" => {
                    let _dataset = expect_record(&args, 0)?;
                    let sop_class = expect_enum(&args, 1)?;
                    let message_id = self.next_message_id();
                    let command = command_dataset(0x0010, message_id, sop_class);
                    self.send_command(command)?;
                }
                "send_c_move" => {
                    let _dataset = expect_record(&args, 0)?;
                    let sop_class = expect_enum(&args, 2)?;
                    let message_id = self.next_message_id();
                    let command = command_dataset(0x0021, message_id, sop_class);
                    self.send_command(command)?;
                }
                "send_c_cancel" => {
                    let message_id = self.next_message_id();
                    let command = command_dataset(0x0FFF, message_id, VERIFICATION_SOP_CLASS);
                    self.send_command(command)?;
                }
                "release" => {
                    self.association.send(&Pdu::ReleaseRQ)?;
                    self.association.receive()?;
                }
                _ => return Ok(()),
            }
            Ok(())
        })();
        if matches!(
            name,
            "send_c_echo" | "send_c_store" | "send_c_find" | "send_c_get" | "send_c_move" | "send_c_cancel" | "release"
        ) {
            Some(result.map_err(ClientCallError::from))
        } else {
            None
        }
    }
}

fn default_dataset() -> Argument {
    Argument::record(
        "dicom.dataset",
        json!({
            "QueryRetrieveLevel": "SERIES",
            "PatientID": "1234567",
            "StudyInstanceUID": "1.2.3",
            "SeriesInstanceUID": "1.2.3.4",
        }),
        // Structural mutation of a DICOM dataset is unimplemented,
        // deliberately (spec §9's open question) — do not change to
        // `ResampleScalarFields`.
        RecordMutation::NoOp,
    )
    .pinned()
}

/// The authored initial DICOM seed: verify the association, store, query
/// (find/get/move), cancel, and release — mirrors `corpus/dicom.py`.
pub fn initial_seed() -> Seed {
    Seed::new(vec![
        Call::new("send_c_echo", vec![Argument::integer(1)]),
        Call::new("send_c_store", vec![default_dataset()]),
        Call::new(
            "send_c_find",
            vec![
                default_dataset(),
                Argument::enumeration(
                    ["1.2.840.10008.5.1.4.1.2.1.1", "1.2.840.10008.5.1.4.31"],
                    "1.2.840.10008.5.1.4.1.2.1.1",
                ),
                Argument::integer(1),
                Argument::integer(2),
            ],
        ),
        Call::new(
            "send_c_get",
            vec![
                default_dataset(),
                Argument::enumeration(
                    ["1.2.840.10008.5.1.4.1.2.1.3", "1.2.840.10008.5.1.4.39.4"],
                    "1.2.840.10008.5.1.4.1.2.1.3",
                ),
                Argument::integer(1),
                Argument::integer(2),
            ],
        ),
        Call::new(
            "send_c_move",
            vec![
                default_dataset(),
                Argument::string("PYNETDICOM"),
                Argument::enumeration(
                    ["1.2.840.10008.5.1.4.1.2.1.2", "1.2.840.10008.5.1.4.39.3"],
                    "1.2.840.10008.5.1.4.1.2.1.2",
                ),
                Argument::integer(1),
                Argument::integer(2),
            ],
        ),
        Call::new("send_c_cancel", vec![Argument::integer(1)]),
        Call::terminal("release", vec![]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_argument_mutation_stays_noop() {
        let mut arg = default_dataset();
        assert!(!arg.mutable, "the DICOM dataset argument is pinned, matching the original's no-op mutate");
        let before = arg.kind.clone();
        arg.mutate(&mut rand::thread_rng());
        assert_eq!(arg.kind, before);
    }

    #[test]
    fn initial_seed_terminates_with_release() {
        let seed = initial_seed();
        assert_eq!(seed.terminal_index(), Some(seed.len() - 1));
        assert_eq!(seed.get(seed.len() - 1).unwrap().name, "release");
    }
}
