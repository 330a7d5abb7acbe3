//! PN532 host protocol constants and frame codec
//!
//! Based on the PN532 User Manual (UM0701-02), normal information frames
//! only:
//!
//! ```text
//! 00 00 FF LEN LCS TFI CMD DATA.. DCS 00
//! ```

use crate::error::{Pn532Error, Result};

/// Preamble and postamble byte
pub const PREAMBLE: u8 = 0x00;
/// Start-of-packet code
pub const START_CODE: [u8; 2] = [0x00, 0xFF];
/// Frame identifier, host to PN532
pub const TFI_HOST: u8 = 0xD4;
/// Frame identifier, PN532 to host
pub const TFI_PN532: u8 = 0xD5;
/// Error frame identifier
pub const TFI_ERROR: u8 = 0x7F;

/// ACK frame sent by the PN532 after every valid command frame
pub const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];
/// NACK frame, asks the other side to resend
pub const NACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00];

/// HSU wake-up sequence (0x55 followed by a long preamble)
pub const WAKEUP: [u8; 16] = [
    0x55, 0x55, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

/// Largest LEN of a normal information frame
pub const MAX_FRAME_LEN: usize = 255;

// ============================================================================
// Commands
// ============================================================================

/// Query IC, firmware version and supported protocols
pub const CMD_GET_FIRMWARE_VERSION: u8 = 0x02;
/// Configure the Security Access Module (must leave low-VBAT mode)
pub const CMD_SAM_CONFIGURATION: u8 = 0x14;
/// Configure RF parameters (retries, timeouts)
pub const CMD_RF_CONFIGURATION: u8 = 0x32;
/// Exchange data with an activated target (PN532 handles framing)
pub const CMD_IN_DATA_EXCHANGE: u8 = 0x40;
/// Exchange raw data with the target (host handles the protocol)
pub const CMD_IN_COMMUNICATE_THRU: u8 = 0x42;
/// Detect and activate targets
pub const CMD_IN_LIST_PASSIVE_TARGET: u8 = 0x4A;
/// Release a target
pub const CMD_IN_RELEASE: u8 = 0x52;

/// SAMConfiguration normal mode
pub const SAM_MODE_NORMAL: u8 = 0x01;
/// RFConfiguration item: MaxRetries
pub const RF_CFG_MAX_RETRIES: u8 = 0x05;
/// Baud rate / modulation: 106 kbps type A (ISO/IEC14443 Type A)
pub const BRTY_106_TYPE_A: u8 = 0x00;

/// Status error bits of InDataExchange / InCommunicateThru
pub const STATUS_ERROR_MASK: u8 = 0x3F;

/// Bytes of tag data one InCommunicateThru / InDataExchange exchange can
/// carry in a normal frame (LEN minus TFI, command and status/target byte)
pub const MAX_TAG_FRAME: usize = MAX_FRAME_LEN - 3;

/// Checksum such that `sum(bytes) + checksum == 0 (mod 256)`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

/// Encode a host-to-PN532 command frame
pub fn encode_frame(command: u8, params: &[u8]) -> Result<Vec<u8>> {
    let len = params.len() + 2;
    if len > MAX_FRAME_LEN {
        return Err(Pn532Error::FrameTooLong {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(len + 7);
    frame.push(PREAMBLE);
    frame.extend_from_slice(&START_CODE);
    frame.push(len as u8);
    frame.push((len as u8).wrapping_neg());
    frame.push(TFI_HOST);
    frame.push(command);
    frame.extend_from_slice(params);
    frame.push(checksum(&frame[5..]));
    frame.push(PREAMBLE);
    Ok(frame)
}

/// Decode the body of a PN532-to-host frame
///
/// `body` is everything after `LEN LCS`: TFI, command, data, DCS. Returns
/// the response command code and its data.
pub fn decode_body(body: &[u8]) -> Result<(u8, Vec<u8>)> {
    let (dcs, payload) = body
        .split_last()
        .ok_or(Pn532Error::InvalidFrame("empty frame"))?;
    if checksum(payload) != *dcs {
        return Err(Pn532Error::Checksum("data"));
    }
    match payload {
        [TFI_ERROR] => Err(Pn532Error::InvalidFrame("application error frame")),
        [TFI_PN532, command, data @ ..] => Ok((*command, data.to_vec())),
        [TFI_PN532] | [] => Err(Pn532Error::InvalidFrame("missing command code")),
        _ => Err(Pn532Error::InvalidFrame("unexpected frame identifier")),
    }
}

/// Check a frame's `LEN LCS` pair
pub fn check_length(len: u8, lcs: u8) -> Result<()> {
    if len.wrapping_add(lcs) != 0 {
        return Err(Pn532Error::Checksum("length"));
    }
    Ok(())
}

/// Firmware identification returned by GetFirmwareVersion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// IC version (0x32 for PN532)
    pub ic: u8,
    /// Firmware version
    pub version: u8,
    /// Firmware revision
    pub revision: u8,
    /// Supported protocol bitmap
    pub support: u8,
}

impl FirmwareVersion {
    /// Parse the 4 data bytes of a GetFirmwareVersion answer
    pub fn parse(data: &[u8]) -> Result<Self> {
        match data {
            [ic, version, revision, support, ..] => Ok(Self {
                ic: *ic,
                version: *version,
                revision: *revision,
                support: *support,
            }),
            _ => Err(Pn532Error::InvalidFrame("short firmware version")),
        }
    }
}

/// A target activated by InListPassiveTarget (106 kbps type A)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// Logical target number assigned by the PN532
    pub tg: u8,
    /// SENS_RES as sent by the PN532
    pub sens_res: [u8; 2],
    /// SEL_RES (SAK)
    pub sel_res: u8,
    /// NFCID1 (UID)
    pub uid: Vec<u8>,
}

impl TargetInfo {
    /// Parse an InListPassiveTarget answer; `None` if no target was found
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        match data {
            [0, ..] => Ok(None),
            [_, tg, sens_hi, sens_lo, sel_res, uid_len, rest @ ..] => {
                let uid_len = *uid_len as usize;
                if rest.len() < uid_len {
                    return Err(Pn532Error::InvalidFrame("truncated NFCID1"));
                }
                Ok(Some(Self {
                    tg: *tg,
                    sens_res: [*sens_hi, *sens_lo],
                    sel_res: *sel_res,
                    uid: rest[..uid_len].to_vec(),
                }))
            }
            _ => Err(Pn532Error::InvalidFrame("short target data")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_get_firmware_version() {
        let frame = encode_frame(CMD_GET_FIRMWARE_VERSION, &[]).unwrap();
        assert_eq!(frame, vec![0x00, 0x00, 0xFF, 0x02, 0xFE, 0xD4, 0x02, 0x2A, 0x00]);
    }

    #[test]
    fn test_encode_sam_configuration() {
        let frame = encode_frame(CMD_SAM_CONFIGURATION, &[SAM_MODE_NORMAL, 0x14, 0x01]).unwrap();
        assert_eq!(
            frame,
            vec![0x00, 0x00, 0xFF, 0x05, 0xFB, 0xD4, 0x14, 0x01, 0x14, 0x01, 0x02, 0x00]
        );
    }

    #[test]
    fn test_encode_rejects_oversized() {
        assert!(encode_frame(CMD_IN_COMMUNICATE_THRU, &[0; 253]).is_ok());
        assert!(matches!(
            encode_frame(CMD_IN_COMMUNICATE_THRU, &[0; 254]),
            Err(Pn532Error::FrameTooLong { len: 256, max: 255 })
        ));
    }

    #[test]
    fn test_decode_firmware_response() {
        // D5 03 32 01 06 07, DCS
        let body = [0xD5, 0x03, 0x32, 0x01, 0x06, 0x07, 0xE8];
        let (cmd, data) = decode_body(&body).unwrap();
        assert_eq!(cmd, 0x03);
        let fw = FirmwareVersion::parse(&data).unwrap();
        assert_eq!(fw.ic, 0x32);
        assert_eq!(fw.version, 1);
        assert_eq!(fw.revision, 6);
    }

    #[test]
    fn test_decode_bad_checksum() {
        let body = [0xD5, 0x03, 0x32, 0x01, 0x06, 0x07, 0x00];
        assert!(matches!(decode_body(&body), Err(Pn532Error::Checksum("data"))));
    }

    #[test]
    fn test_decode_error_frame() {
        assert!(matches!(
            decode_body(&[TFI_ERROR, 0x81]),
            Err(Pn532Error::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_check_length() {
        assert!(check_length(0x02, 0xFE).is_ok());
        assert!(check_length(0x02, 0xFD).is_err());
    }

    #[test]
    fn test_parse_target() {
        let data = [
            0x01, 0x01, 0x00, 0x44, 0x00, 0x07, 0x04, 0x8A, 0x5C, 0x12, 0x34, 0x56, 0x80,
        ];
        let target = TargetInfo::parse(&data).unwrap().unwrap();
        assert_eq!(target.tg, 1);
        assert_eq!(target.sens_res, [0x00, 0x44]);
        assert_eq!(target.sel_res, 0x00);
        assert_eq!(target.uid, vec![0x04, 0x8A, 0x5C, 0x12, 0x34, 0x56, 0x80]);

        assert_eq!(TargetInfo::parse(&[0x00]).unwrap(), None);
        assert!(TargetInfo::parse(&[0x01, 0x01, 0x00, 0x44, 0x00, 0x07, 0x04]).is_err());
    }
}
