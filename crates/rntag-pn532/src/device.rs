//! PN532 device implementation
//!
//! This module provides the `Pn532` struct that runs the host side of the
//! PN532 command/ACK/response exchange.

use crate::error::{Pn532Error, Result};
use crate::protocol::*;
use crate::transport::Transport;

/// Bytes skipped while looking for a start code before giving up
const MAX_SYNC_BYTES: usize = 64;

/// PN532 reader
pub struct Pn532<T: Transport> {
    /// Transport layer (serial)
    transport: T,
    /// Firmware reported during initialization
    firmware: FirmwareVersion,
}

impl<T: Transport> Pn532<T> {
    /// Create a new Pn532 instance with the given transport
    ///
    /// This performs initialization:
    /// 1. Wake the HSU interface
    /// 2. Leave low-VBAT mode (SAMConfiguration, normal mode)
    /// 3. Query firmware version
    /// 4. Bound passive activation retries so detection does not block
    pub fn new(transport: T) -> Result<Self> {
        let mut pn532 = Self {
            transport,
            firmware: FirmwareVersion {
                ic: 0,
                version: 0,
                revision: 0,
                support: 0,
            },
        };

        pn532.transport.write(&WAKEUP)?;
        pn532.transport.clear_input()?;

        pn532
            .command(CMD_SAM_CONFIGURATION, &[SAM_MODE_NORMAL, 0x14, 0x01])
            .map_err(|e| Pn532Error::ConnectionFailed(e.to_string()))?;
        log::debug!("pn532: SAM configured");

        let data = pn532.command(CMD_GET_FIRMWARE_VERSION, &[])?;
        pn532.firmware = FirmwareVersion::parse(&data)?;
        log::debug!(
            "pn532: IC 0x{:02X}, firmware {}.{}",
            pn532.firmware.ic,
            pn532.firmware.version,
            pn532.firmware.revision
        );

        pn532.set_max_retries(0x10)?;

        Ok(pn532)
    }

    /// Firmware reported by the reader
    pub fn firmware(&self) -> FirmwareVersion {
        self.firmware
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a command frame and wait for the ACK
    fn write_command(&mut self, command: u8, params: &[u8]) -> Result<()> {
        let frame = encode_frame(command, params)?;
        log::trace!("pn532: > cmd 0x{:02X} ({} bytes)", command, params.len());
        self.transport.write(&frame)?;

        let mut ack = [0u8; 6];
        self.transport.read(&mut ack)?;
        if ack == ACK_FRAME {
            Ok(())
        } else if ack == NACK_FRAME {
            Err(Pn532Error::Rejected(command))
        } else {
            log::debug!("pn532: expected ACK, got {:02X?}", ack);
            Err(Pn532Error::NoAck(command))
        }
    }

    /// Read one response frame, returning its command code and data
    fn read_frame(&mut self) -> Result<(u8, Vec<u8>)> {
        let mut byte = [0u8; 1];
        let mut prev = 0xFF;
        let mut skipped = 0;
        loop {
            self.transport.read(&mut byte)?;
            if prev == START_CODE[0] && byte[0] == START_CODE[1] {
                break;
            }
            prev = byte[0];
            skipped += 1;
            if skipped > MAX_SYNC_BYTES {
                return Err(Pn532Error::InvalidFrame("no start code"));
            }
        }

        let mut header = [0u8; 2];
        self.transport.read(&mut header)?;
        check_length(header[0], header[1])?;
        if header[0] == 0 {
            return Err(Pn532Error::InvalidFrame("ACK where a response was expected"));
        }

        // TFI..DATA, DCS, postamble
        let mut body = vec![0u8; header[0] as usize + 2];
        self.transport.read(&mut body)?;
        body.pop();
        decode_body(&body)
    }

    /// Run a command and return the response data
    pub fn command(&mut self, command: u8, params: &[u8]) -> Result<Vec<u8>> {
        self.write_command(command, params)?;
        let (response, data) = self.read_frame()?;
        if response != command.wrapping_add(1) {
            return Err(Pn532Error::UnexpectedResponse {
                command,
                actual: response,
            });
        }
        log::trace!("pn532: < resp 0x{:02X} ({} bytes)", response, data.len());
        Ok(data)
    }

    /// Set how often passive activation is retried (0xFF = forever)
    pub fn set_max_retries(&mut self, passive_activation: u8) -> Result<()> {
        self.command(
            CMD_RF_CONFIGURATION,
            &[RF_CFG_MAX_RETRIES, 0xFF, 0x01, passive_activation],
        )?;
        Ok(())
    }

    /// Detect and activate one ISO14443A target
    pub fn list_passive_target(&mut self) -> Result<Option<TargetInfo>> {
        let data = self.command(CMD_IN_LIST_PASSIVE_TARGET, &[0x01, BRTY_106_TYPE_A])?;
        let target = TargetInfo::parse(&data)?;
        if let Some(t) = &target {
            log::debug!(
                "pn532: target {} uid {:02X?} sak 0x{:02X}",
                t.tg,
                t.uid,
                t.sel_res
            );
        }
        Ok(target)
    }

    /// Exchange data with target `tg`, letting the PN532 handle the protocol
    pub fn data_exchange(&mut self, tg: u8, data: &[u8]) -> Result<Vec<u8>> {
        check_tag_frame(data.len())?;
        let mut params = Vec::with_capacity(data.len() + 1);
        params.push(tg);
        params.extend_from_slice(data);
        split_status(self.command(CMD_IN_DATA_EXCHANGE, &params)?)
    }

    /// Exchange a raw frame with the current target
    pub fn communicate_thru(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        check_tag_frame(data.len())?;
        split_status(self.command(CMD_IN_COMMUNICATE_THRU, data)?)
    }

    /// Release target `tg`
    pub fn release(&mut self, tg: u8) -> Result<()> {
        let data = self.command(CMD_IN_RELEASE, &[tg])?;
        split_status(data).map(|_| ())
    }
}

fn check_tag_frame(len: usize) -> Result<()> {
    if len > MAX_TAG_FRAME {
        return Err(Pn532Error::FrameTooLong {
            len,
            max: MAX_TAG_FRAME,
        });
    }
    Ok(())
}

/// Strip and check the leading status byte
fn split_status(mut data: Vec<u8>) -> Result<Vec<u8>> {
    let status = *data
        .first()
        .ok_or(Pn532Error::InvalidFrame("missing status byte"))?;
    if status & STATUS_ERROR_MASK != 0 {
        return Err(Pn532Error::Status(status & STATUS_ERROR_MASK));
    }
    data.remove(0);
    Ok(data)
}
