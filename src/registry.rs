//! Driver registration and dispatch
//!
//! Drivers are selected with a string of the form `name[:key=value,...]`,
//! feature-gated at compile time. Opening a driver detects a tag and picks
//! the transport through [`TagAdapter::probe`].

use std::collections::HashMap;

use rntag_core::nfc::OpcodeTable;
use rntag_core::tag::TagAdapter;
use rntag_core::transport::{DriverInfo, TagTechnologies};

/// Parsed driver parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverParams {
    /// Driver name
    pub name: String,
    /// Key-value options
    pub params: HashMap<String, String>,
}

impl DriverParams {
    fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Parse a driver string such as `pn532:dev=/dev/ttyUSB0,baud=115200`
pub fn parse_driver_params(s: &str) -> Result<DriverParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    if name.is_empty() {
        return Err("Driver name missing".into());
    }

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(DriverParams {
        name: name.to_string(),
        params,
    })
}

/// Keep only the driver kinds named by a `mode=page|raw|both` option
fn restrict_technologies(
    mut techs: TagTechnologies,
    mode: Option<&str>,
) -> Result<TagTechnologies, Box<dyn std::error::Error>> {
    match mode.map(str::to_ascii_lowercase).as_deref() {
        None | Some("both") => {}
        Some("page") => techs.raw = None,
        Some("raw") => techs.page = None,
        Some(other) => {
            return Err(format!("Invalid mode: {}. Use page, raw or both", other).into())
        }
    }
    Ok(techs)
}

/// Open a driver, detect a tag and build an adapter for it
///
/// # Example
/// ```ignore
/// let mut tag = open_tag("dummy", OpcodeTable::default())?;
/// let version = tag.with_session(|t| t.get_version())?;
/// ```
pub fn open_tag(
    driver: &str,
    opcodes: OpcodeTable,
) -> Result<TagAdapter, Box<dyn std::error::Error>> {
    let params = parse_driver_params(driver)?;

    let techs = match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, opcodes)?,

        #[cfg(feature = "pn532")]
        "pn532" => open_pn532(&params)?,

        _ => return Err(format!("Unknown driver: {}", params.name).into()),
    };

    let adapter = TagAdapter::probe(techs, opcodes)?;
    log::info!(
        "Using {} transport (max {} bytes per exchange)",
        adapter.kind(),
        adapter.max_transceive_length()
    );
    Ok(adapter)
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &DriverParams,
    opcodes: OpcodeTable,
) -> Result<TagTechnologies, Box<dyn std::error::Error>> {
    use rntag_dummy::{DummyConfig, DummyTag};

    let mut config = DummyConfig {
        opcodes,
        ..DummyConfig::default()
    };
    if let Some(max) = params.get("max") {
        config.max_transceive_length = max
            .parse()
            .map_err(|_| format!("Invalid max transceive length: {}", max))?;
    }

    log::info!("Using in-memory NTAG215 emulator");
    let tag = DummyTag::new(config);
    restrict_technologies(tag.technologies(), params.get("mode"))
}

#[cfg(feature = "pn532")]
fn open_pn532(params: &DriverParams) -> Result<TagTechnologies, Box<dyn std::error::Error>> {
    use rntag_pn532::{parse_timeout_ms, TechnologyMode};

    let dev = params
        .get("dev")
        .ok_or("pn532 requires dev=<port> parameter")?;
    let baud = params
        .get("baud")
        .map(|b| b.parse::<u32>())
        .transpose()
        .map_err(|_| "Invalid baud rate")?;
    let timeout = params.get("timeout").map(parse_timeout_ms).transpose()?;
    let mode: TechnologyMode = params.get("mode").unwrap_or("both").parse()?;

    let reader = rntag_pn532::open_serial(dev, baud, timeout)?;
    let fw = reader.firmware();
    log::info!(
        "PN532 IC 0x{:02X}, firmware {}.{}",
        fw.ic,
        fw.version,
        fw.revision
    );
    Ok(reader.detect(mode)?)
}

/// Get information about all available drivers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_drivers() -> Vec<DriverInfo> {
    let mut drivers = Vec::new();

    #[cfg(feature = "dummy")]
    drivers.push(DriverInfo {
        name: "dummy",
        description: "In-memory NTAG215 with N2 banks (max=<bytes>,mode=page|raw|both)",
    });

    #[cfg(feature = "pn532")]
    drivers.push(DriverInfo {
        name: "pn532",
        description:
            "NXP PN532 over serial HSU (dev=<port>,baud=<rate>,timeout=<ms>,mode=page|raw|both)",
    });

    drivers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let params = parse_driver_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_parse_with_options() {
        let params = parse_driver_params("pn532:dev=/dev/ttyUSB0,baud=115200").unwrap();
        assert_eq!(params.name, "pn532");
        assert_eq!(params.get("dev"), Some("/dev/ttyUSB0"));
        assert_eq!(params.get("baud"), Some("115200"));
    }

    #[test]
    fn test_parse_rejects_bare_option() {
        assert!(parse_driver_params("pn532:dev").is_err());
        assert!(parse_driver_params(":dev=x").is_err());
    }

    #[test]
    fn test_unknown_driver() {
        let err = open_tag("nope", OpcodeTable::default()).err().unwrap();
        assert!(err.to_string().contains("Unknown driver"));
    }

    #[test]
    fn test_restrict_technologies_rejects_bad_mode() {
        assert!(restrict_technologies(TagTechnologies::default(), Some("both")).is_ok());
        assert!(restrict_technologies(TagTechnologies::default(), Some("fast")).is_err());
    }

    #[cfg(feature = "pn532")]
    #[test]
    fn test_pn532_options_checked_before_open() {
        let err = open_tag("pn532:dev=/nonexistent,timeout=0", OpcodeTable::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("timeout"));

        let err = open_tag("pn532:dev=/nonexistent,mode=mifare", OpcodeTable::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("mode"));
    }

    #[cfg(feature = "dummy")]
    mod dummy {
        use super::*;
        use rntag_core::tag::TransportKind;

        #[test]
        fn test_dummy_prefers_page_driver() {
            let tag = open_tag("dummy", OpcodeTable::default()).unwrap();
            assert_eq!(tag.kind(), TransportKind::Page);
        }

        #[test]
        fn test_dummy_raw_mode() {
            let tag = open_tag("dummy:mode=raw,max=64", OpcodeTable::default()).unwrap();
            assert_eq!(tag.kind(), TransportKind::Raw);
            assert_eq!(tag.max_transceive_length(), 64 / 4 + 1);
        }

        #[test]
        fn test_dummy_full_read() {
            let mut tag = open_tag("dummy", OpcodeTable::default()).unwrap();
            let dump = tag.with_session(|t| t.fast_read(0, 134)).unwrap();
            assert_eq!(dump.len(), 135 * 4);
        }

        #[test]
        fn test_dummy_bad_max() {
            assert!(open_tag("dummy:max=lots", OpcodeTable::default()).is_err());
        }
    }
}
