//! Device metadata from the `/status/zp` document.

use super::utils::extract_xml_text;

/// Identity and firmware details of a zone player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneMetadata {
    /// Lowercased `LocalUID`.
    pub uid: String,
    pub zone_name: String,
    pub zone_icon: String,
    pub serial_number: String,
    pub software_version: String,
    pub hardware_version: String,
    pub mac_address: String,
}

/// Parses the `/status/zp` document.
///
/// Returns `None` when the document has no `ZoneName` or `LocalUID`
/// (the device is not a configured zone player).
#[must_use]
pub fn parse_status_zp(xml: &str) -> Option<ZoneMetadata> {
    let zone_name = extract_xml_text(xml, "ZoneName")?;
    let uid = extract_xml_text(xml, "LocalUID")?.trim().to_lowercase();
    if uid.is_empty() {
        return None;
    }

    let text = |name: &str| extract_xml_text(xml, name).unwrap_or_default();

    Some(ZoneMetadata {
        uid,
        zone_name,
        zone_icon: text("ZoneIcon"),
        serial_number: text("SerialNumber"),
        software_version: text("SoftwareVersion"),
        hardware_version: text("HardwareVersion"),
        mac_address: text("MACAddress"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_fixtures::STATUS_ZP_KITCHEN;

    #[test]
    fn parses_identity_fields() {
        let meta = parse_status_zp(STATUS_ZP_KITCHEN).expect("metadata");
        assert_eq!(meta.uid, "rincon_000e58a1b2c301400");
        assert_eq!(meta.zone_name, "Kitchen");
        assert_eq!(meta.zone_icon, "x-rincon-roomicon:kitchen");
        assert_eq!(meta.serial_number, "00-0E-58-A1-B2-C3:5");
        assert_eq!(meta.software_version, "57.3-77280");
        assert_eq!(meta.hardware_version, "1.20.1.6-2");
        assert_eq!(meta.mac_address, "00:0E:58:A1:B2:C3");
    }

    #[test]
    fn document_without_zone_name_is_rejected() {
        assert!(parse_status_zp("<ZPSupportInfo><ZPInfo/></ZPSupportInfo>").is_none());
    }
}
