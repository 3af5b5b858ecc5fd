//! # Plugin Representation: The Five Records
//!
//! `PluginDefinition` is the aggregate root: it binds a plugin's identity
//! (`PluginInfo`) to the optional filters that narrow the set of network
//! targets the plugin applies to.
//!
//! ## Invariants
//!
//! - A definition owns at most one instance of each filter. An absent
//!   filter (`None`) and a present filter with every sub-field empty both
//!   mean "unconstrained", but they stay distinguishable through encode
//!   and decode.
//! - Records are plain values. Once decoded they are only read.
//! - `PluginType` is open: numbers unknown to this build decode into
//!   [`PluginType::Unrecognized`] and are re-encoded unchanged.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{
    encode_message, encode_repeated_string, encode_string, encode_varint_field, merge_message,
    preserve_unhandled, read_bool, read_enum, read_string, read_uint32, DecodeContext, Message,
};
use crate::descriptor::{
    FieldDescriptor, MessageDescriptor, PLUGIN_DEFINITION, PLUGIN_INFO, PLUGIN_TYPE,
    TARGET_OPERATING_SYSTEM_CLASS, TARGET_SERVICE_NAME, TARGET_SOFTWARE,
};
use crate::error::{DecodeError, ProtoError};
use crate::wire::{Reader, UnknownFields};

/// Functional category of a plugin.
///
/// | Number | Wire name |
/// |--------|-----------|
/// | 0 | `PLUGIN_TYPE_UNSPECIFIED` |
/// | 1 | `PORT_SCAN` |
/// | 2 | `SERVICE_FINGERPRINT` |
/// | 3 | `VULN_DETECTION` |
///
/// Construct from a wire number with [`PluginType::from_i32`], which maps
/// known numbers to their named variant. `Unrecognized` only ever holds
/// numbers outside the known set; [`UnknownPluginType`] cannot be built
/// any other way, so equality and hashing agree with [`PluginType::as_i32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PluginType {
    /// Not yet classified. A definition meant for active use should never
    /// carry this value.
    #[default]
    Unspecified,
    /// Discovers open ports and services.
    PortScan,
    /// Identifies the software behind a service.
    ServiceFingerprint,
    /// Detects a vulnerability on a matched service.
    VulnDetection,
    /// A value added by a newer producer.
    Unrecognized(UnknownPluginType),
}

/// A `PluginType` number this build has no name for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnknownPluginType(i32);

impl UnknownPluginType {
    /// The wire number.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl PluginType {
    /// The four values known to this build, in numeric order.
    pub fn known() -> &'static [PluginType] {
        &[
            Self::Unspecified,
            Self::PortScan,
            Self::ServiceFingerprint,
            Self::VulnDetection,
        ]
    }

    /// Map a wire number to a variant.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Unspecified,
            1 => Self::PortScan,
            2 => Self::ServiceFingerprint,
            3 => Self::VulnDetection,
            other => Self::Unrecognized(UnknownPluginType(other)),
        }
    }

    /// Wire number of this value.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::PortScan => 1,
            Self::ServiceFingerprint => 2,
            Self::VulnDetection => 3,
            Self::Unrecognized(unknown) => unknown.value(),
        }
    }

    /// Wire name, or `None` for a value unknown to this build.
    pub fn as_str_name(&self) -> Option<&'static str> {
        PLUGIN_TYPE.name_of(self.as_i32())
    }

    /// Parse a wire name.
    pub fn from_str_name(name: &str) -> Option<Self> {
        PLUGIN_TYPE.number_of(name).map(Self::from_i32)
    }

    /// Returns true for the four values known to this build.
    pub fn is_known(&self) -> bool {
        self.as_str_name().is_some()
    }

    /// Returns true for `PLUGIN_TYPE_UNSPECIFIED`.
    pub fn is_unspecified(&self) -> bool {
        self.as_i32() == 0
    }
}

impl fmt::Display for PluginType {
    /// Renders the wire name, or the decimal number for unknown values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.as_i32()),
        }
    }
}

impl FromStr for PluginType {
    type Err = ProtoError;

    /// Accepts the wire names produced by `Display` and decimal numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(plugin_type) = Self::from_str_name(s) {
            return Ok(plugin_type);
        }
        s.parse::<i32>()
            .map(Self::from_i32)
            .map_err(|_| ProtoError::UnknownPluginType(s.to_string()))
    }
}

impl Serialize for PluginType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str_name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_i32(self.as_i32()),
        }
    }
}

impl<'de> Deserialize<'de> for PluginType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PluginTypeVisitor;

        impl Visitor<'_> for PluginTypeVisitor {
            type Value = PluginType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a PluginType wire name or an int32")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PluginType, E> {
                PluginType::from_str_name(v)
                    .ok_or_else(|| E::unknown_variant(v, &PLUGIN_TYPE_NAMES))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<PluginType, E> {
                i32::try_from(v)
                    .map(PluginType::from_i32)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PluginType, E> {
                i32::try_from(v)
                    .map(PluginType::from_i32)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }
        }

        deserializer.deserialize_any(PluginTypeVisitor)
    }
}

const PLUGIN_TYPE_NAMES: [&str; 4] = [
    "PLUGIN_TYPE_UNSPECIFIED",
    "PORT_SCAN",
    "SERVICE_FINGERPRINT",
    "VULN_DETECTION",
];

/// Static identity and metadata of a plugin.
///
/// No uniqueness is enforced on any field; that is a registry concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginInfo {
    /// Functional category.
    #[serde(rename = "type", skip_serializing_if = "PluginType::is_unspecified")]
    pub plugin_type: PluginType,
    /// Plugin name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Plugin version.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Plugin author.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    /// Fields from a newer schema version, preserved for re-encoding.
    #[serde(skip)]
    pub unknown_fields: UnknownFields,
}

impl PluginInfo {
    /// Identity without a description.
    pub fn new(
        plugin_type: PluginType,
        name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            plugin_type,
            name: name.into(),
            version: version.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Plugin identifier in the form `/{author}/{type}/{name}/{version}`.
    pub fn id(&self) -> String {
        format!(
            "/{}/{}/{}/{}",
            self.author, self.plugin_type, self.name, self.version
        )
    }
}

/// Filter on the detected service name (e.g. `http`, `ssh`).
///
/// A target matches when its service name is a case-sensitive member of
/// `value`. An empty list leaves the filter unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetServiceName {
    /// Accepted service names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<String>,
    /// Fields from a newer schema version, preserved for re-encoding.
    #[serde(skip)]
    pub unknown_fields: UnknownFields,
}

impl TargetServiceName {
    /// Filter accepting any of `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns true if the filter constrains nothing.
    pub fn is_unconstrained(&self) -> bool {
        self.value.is_empty()
    }
}

/// Filter on the detected software product and version.
///
/// `name` is compared ASCII case-insensitively. `value` holds version
/// strings or range expressions; see [`crate::version`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSoftware {
    /// Software identifier.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Accepted versions or version ranges.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<String>,
    /// Fields from a newer schema version, preserved for re-encoding.
    #[serde(skip)]
    pub unknown_fields: UnknownFields,
}

impl TargetSoftware {
    /// Filter on `name`, accepting any of `versions` (any version when
    /// empty).
    pub fn new<I, S>(name: impl Into<String>, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            value: versions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns true if the filter constrains nothing.
    pub fn is_unconstrained(&self) -> bool {
        self.name.is_empty() && self.value.is_empty()
    }
}

/// Filter on the operating system fingerprint reported by the port
/// scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetOperatingSystemClass {
    /// Accepted vendors (e.g. `Microsoft`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vendor: Vec<String>,
    /// Accepted OS families (e.g. `Windows`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub os_family: Vec<String>,
    /// Lowest acceptable detection confidence, 0-100.
    #[serde(skip_serializing_if = "is_zero")]
    pub min_accuracy: u32,
    /// Fields from a newer schema version, preserved for re-encoding.
    #[serde(skip)]
    pub unknown_fields: UnknownFields,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl TargetOperatingSystemClass {
    /// Filter on vendor and family lists with a minimum accuracy.
    pub fn new<V, F, S, T>(vendors: V, families: F, min_accuracy: u32) -> Self
    where
        V: IntoIterator<Item = S>,
        F: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            vendor: vendors.into_iter().map(Into::into).collect(),
            os_family: families.into_iter().map(Into::into).collect(),
            min_accuracy,
            ..Self::default()
        }
    }

    /// Returns true if the filter constrains nothing.
    pub fn is_unconstrained(&self) -> bool {
        self.vendor.is_empty() && self.os_family.is_empty() && self.min_accuracy == 0
    }
}

/// A plugin's identity bound to its applicability filters.
///
/// A target matches when every present filter holds; see
/// [`crate::matching::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginDefinition {
    /// Identity. Absence means an undefined plugin; rejecting it is the
    /// orchestrator's job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<PluginInfo>,
    /// Service name filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_service_name: Option<TargetServiceName>,
    /// Software filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_software: Option<TargetSoftware>,
    /// Restrict to services classified as web services.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub for_web_service: bool,
    /// Operating system filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_operating_system_class: Option<TargetOperatingSystemClass>,
    /// Fields from a newer schema version, preserved for re-encoding.
    #[serde(skip)]
    pub unknown_fields: UnknownFields,
}

impl PluginDefinition {
    /// Definition with no filters, matching every target.
    pub fn new(info: PluginInfo) -> Self {
        Self {
            info: Some(info),
            ..Self::default()
        }
    }

    /// Add a service name filter.
    pub fn with_service_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_service_name = Some(TargetServiceName::new(names));
        self
    }

    /// Add a software filter.
    pub fn with_software<I, S>(mut self, name: impl Into<String>, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_software = Some(TargetSoftware::new(name, versions));
        self
    }

    /// Restrict (or stop restricting) to web services.
    pub fn with_web_service(mut self, for_web_service: bool) -> Self {
        self.for_web_service = for_web_service;
        self
    }

    /// Add an operating system filter.
    pub fn with_operating_system_class(mut self, os_class: TargetOperatingSystemClass) -> Self {
        self.target_operating_system_class = Some(os_class);
        self
    }

    /// Plugin identifier, or `None` when `info` is absent.
    pub fn id(&self) -> Option<String> {
        self.info.as_ref().map(PluginInfo::id)
    }

    /// Plugin type, `Unspecified` when `info` is absent.
    pub fn plugin_type(&self) -> PluginType {
        self.info
            .as_ref()
            .map(|info| info.plugin_type)
            .unwrap_or_default()
    }

    /// Returns true if no filter is present.
    pub fn has_no_filters(&self) -> bool {
        self.target_service_name.is_none()
            && self.target_software.is_none()
            && !self.for_web_service
            && self.target_operating_system_class.is_none()
    }
}

impl Message for PluginDefinition {
    fn descriptor() -> &'static MessageDescriptor {
        &PLUGIN_DEFINITION
    }

    fn encode_fields(&self, buf: &mut Vec<u8>) {
        if let Some(info) = &self.info {
            encode_message(1, info, buf);
        }
        if let Some(service_name) = &self.target_service_name {
            encode_message(2, service_name, buf);
        }
        if let Some(software) = &self.target_software {
            encode_message(3, software, buf);
        }
        encode_varint_field(4, u64::from(self.for_web_service), buf);
        if let Some(os_class) = &self.target_operating_system_class {
            encode_message(5, os_class, buf);
        }
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match field.number {
            1 => merge_message(&mut self.info, reader, ctx),
            2 => merge_message(&mut self.target_service_name, reader, ctx),
            3 => merge_message(&mut self.target_software, reader, ctx),
            4 => {
                self.for_web_service = read_bool(reader)?;
                Ok(())
            }
            5 => merge_message(&mut self.target_operating_system_class, reader, ctx),
            _ => preserve_unhandled(&mut self.unknown_fields, field, reader, ctx),
        }
    }

    fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }

    fn unknown_fields_mut(&mut self) -> &mut UnknownFields {
        &mut self.unknown_fields
    }
}

impl Message for PluginInfo {
    fn descriptor() -> &'static MessageDescriptor {
        &PLUGIN_INFO
    }

    fn encode_fields(&self, buf: &mut Vec<u8>) {
        // int32 enums are sign-extended to 64 bits on the wire.
        encode_varint_field(1, i64::from(self.plugin_type.as_i32()) as u64, buf);
        encode_string(2, &self.name, buf);
        encode_string(3, &self.version, buf);
        encode_string(4, &self.description, buf);
        encode_string(5, &self.author, buf);
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match field.number {
            1 => {
                let value = read_enum(reader)?;
                let plugin_type = PluginType::from_i32(value);
                if ctx.options().strict_enums && !plugin_type.is_known() {
                    return Err(DecodeError::UnknownEnumValue {
                        enum_name: PLUGIN_TYPE.full_name,
                        value,
                    });
                }
                self.plugin_type = plugin_type;
            }
            2 => self.name = read_string(reader, PLUGIN_INFO.name, field.name)?,
            3 => self.version = read_string(reader, PLUGIN_INFO.name, field.name)?,
            4 => self.description = read_string(reader, PLUGIN_INFO.name, field.name)?,
            5 => self.author = read_string(reader, PLUGIN_INFO.name, field.name)?,
            _ => return preserve_unhandled(&mut self.unknown_fields, field, reader, ctx),
        }
        Ok(())
    }

    fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }

    fn unknown_fields_mut(&mut self) -> &mut UnknownFields {
        &mut self.unknown_fields
    }
}

impl Message for TargetServiceName {
    fn descriptor() -> &'static MessageDescriptor {
        &TARGET_SERVICE_NAME
    }

    fn encode_fields(&self, buf: &mut Vec<u8>) {
        encode_repeated_string(1, &self.value, buf);
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match field.number {
            1 => {
                let value = read_string(reader, TARGET_SERVICE_NAME.name, field.name)?;
                self.value.push(value);
                Ok(())
            }
            _ => preserve_unhandled(&mut self.unknown_fields, field, reader, ctx),
        }
    }

    fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }

    fn unknown_fields_mut(&mut self) -> &mut UnknownFields {
        &mut self.unknown_fields
    }
}

impl Message for TargetSoftware {
    fn descriptor() -> &'static MessageDescriptor {
        &TARGET_SOFTWARE
    }

    fn encode_fields(&self, buf: &mut Vec<u8>) {
        encode_string(1, &self.name, buf);
        encode_repeated_string(2, &self.value, buf);
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match field.number {
            1 => self.name = read_string(reader, TARGET_SOFTWARE.name, field.name)?,
            2 => {
                let value = read_string(reader, TARGET_SOFTWARE.name, field.name)?;
                self.value.push(value);
            }
            _ => return preserve_unhandled(&mut self.unknown_fields, field, reader, ctx),
        }
        Ok(())
    }

    fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }

    fn unknown_fields_mut(&mut self) -> &mut UnknownFields {
        &mut self.unknown_fields
    }
}

impl Message for TargetOperatingSystemClass {
    fn descriptor() -> &'static MessageDescriptor {
        &TARGET_OPERATING_SYSTEM_CLASS
    }

    fn encode_fields(&self, buf: &mut Vec<u8>) {
        encode_repeated_string(1, &self.vendor, buf);
        encode_repeated_string(2, &self.os_family, buf);
        encode_varint_field(3, u64::from(self.min_accuracy), buf);
    }

    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        let message = TARGET_OPERATING_SYSTEM_CLASS.name;
        match field.number {
            1 => self.vendor.push(read_string(reader, message, field.name)?),
            2 => self.os_family.push(read_string(reader, message, field.name)?),
            3 => self.min_accuracy = read_uint32(reader)?,
            _ => return preserve_unhandled(&mut self.unknown_fields, field, reader, ctx),
        }
        Ok(())
    }

    fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }

    fn unknown_fields_mut(&mut self) -> &mut UnknownFields {
        &mut self.unknown_fields
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use proptest::option;

    fn strings() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-zA-Z0-9./ -]{0,12}", 0..4)
    }

    fn plugin_type() -> impl Strategy<Value = PluginType> {
        prop_oneof![
            Just(PluginType::Unspecified),
            Just(PluginType::PortScan),
            Just(PluginType::ServiceFingerprint),
            Just(PluginType::VulnDetection),
            any::<i32>().prop_map(PluginType::from_i32),
        ]
    }

    fn plugin_info() -> impl Strategy<Value = PluginInfo> {
        (plugin_type(), ".{0,16}", ".{0,8}", ".{0,32}", ".{0,16}").prop_map(
            |(plugin_type, name, version, description, author)| PluginInfo {
                plugin_type,
                name,
                version,
                description,
                author,
                unknown_fields: UnknownFields::default(),
            },
        )
    }

    fn definition() -> impl Strategy<Value = PluginDefinition> {
        (
            option::of(plugin_info()),
            option::of(strings().prop_map(TargetServiceName::new)),
            option::of(("[a-z]{0,8}", strings()).prop_map(|(n, v)| TargetSoftware::new(n, v))),
            any::<bool>(),
            option::of(
                (strings(), strings(), any::<u32>())
                    .prop_map(|(v, f, a)| TargetOperatingSystemClass::new(v, f, a)),
            ),
        )
            .prop_map(|(info, service, software, web, os)| PluginDefinition {
                info,
                target_service_name: service,
                target_software: software,
                for_web_service: web,
                target_operating_system_class: os,
                unknown_fields: UnknownFields::default(),
            })
    }

    proptest! {
        /// decode(encode(d)) == d, absent-vs-empty included.
        #[test]
        fn encode_decode_round_trip(def in definition()) {
            let decoded = PluginDefinition::decode(&def.encode_to_vec()).unwrap();
            prop_assert_eq!(decoded, def);
        }

        /// Re-encoding a decoded message reproduces the original bytes.
        #[test]
        fn reencode_is_stable(def in definition()) {
            let bytes = def.encode_to_vec();
            let decoded = PluginDefinition::decode(&bytes).unwrap();
            prop_assert_eq!(decoded.encode_to_vec(), bytes);
        }

        /// Equality of plugin types agrees with their wire numbers.
        #[test]
        fn plugin_type_equality_follows_number(a in any::<i32>(), b in any::<i32>()) {
            prop_assert_eq!(PluginType::from_i32(a) == PluginType::from_i32(b), a == b);
            let info = PluginInfo::new(PluginType::from_i32(a), "p", "1", "t");
            prop_assert_eq!(PluginInfo::decode(&info.encode_to_vec()).unwrap(), info);
        }

        /// Decoding arbitrary bytes never panics.
        #[test]
        fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = PluginDefinition::decode(&bytes);
        }
    }
}
