//! # Schema Descriptors: Static Field Table
//!
//! The wire contract of the `tsunami.proto` plugin representation as a
//! constant table: every message, its fields, their tag numbers and types,
//! and the values of the `PluginType` enum.
//!
//! ## Compatibility Invariant
//!
//! Tag numbers in this table are the interoperability contract with every
//! existing producer and consumer. They must never be renumbered or reused;
//! new fields and enum values are appended.
//!
//! The table is built at compile time. There is no registration step and no
//! global mutable state; concurrent readers share it freely.

use crate::wire::WireType;

/// Logical namespace shared by every message in this schema.
pub const PACKAGE: &str = "tsunami.proto";

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// An embedded message, identified by its short name.
    Message(&'static str),
    /// An enum, identified by its fully qualified name.
    Enum(&'static str),
    /// `bool`.
    Bool,
    /// `uint32`.
    UInt32,
    /// `string`.
    String,
}

impl FieldKind {
    /// Wire type every occurrence of a field of this kind must use.
    pub const fn wire_type(&self) -> WireType {
        match self {
            Self::Message(_) | Self::String => WireType::LengthDelimited,
            Self::Enum(_) | Self::Bool | Self::UInt32 => WireType::Varint,
        }
    }

    /// Type name as it appears in the schema source.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Message(name) | Self::Enum(name) => *name,
            Self::Bool => "bool",
            Self::UInt32 => "uint32",
            Self::String => "string",
        }
    }
}

/// Whether a field holds one value or a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one value; the last occurrence on the wire wins.
    Singular,
    /// Zero or more values, in wire order.
    Repeated,
}

/// One field of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Field name in the schema source (snake_case).
    pub name: &'static str,
    /// Field name in the JSON mapping (lowerCamelCase).
    pub json_name: &'static str,
    /// Wire tag.
    pub number: u32,
    /// Declared type.
    pub kind: FieldKind,
    /// Singular or repeated.
    pub cardinality: Cardinality,
}

/// One message of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageDescriptor {
    /// Short message name.
    pub name: &'static str,
    /// Name qualified by [`PACKAGE`].
    pub full_name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl MessageDescriptor {
    /// Look up a field by its wire tag.
    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Look up a field by its schema name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One value of an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValueDescriptor {
    /// Wire name of the value.
    pub name: &'static str,
    /// Numeric value.
    pub number: i32,
}

/// An enum of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumDescriptor {
    /// Short enum name.
    pub name: &'static str,
    /// Name qualified by [`PACKAGE`] and the enclosing message.
    pub full_name: &'static str,
    /// Values in declaration order.
    pub values: &'static [EnumValueDescriptor],
}

impl EnumDescriptor {
    /// Wire name of a numeric value, if it is known.
    pub fn name_of(&self, number: i32) -> Option<&'static str> {
        self.values.iter().find(|v| v.number == number).map(|v| v.name)
    }

    /// Numeric value of a wire name, if it is known.
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }
}

const fn singular(
    name: &'static str,
    json_name: &'static str,
    number: u32,
    kind: FieldKind,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        json_name,
        number,
        kind,
        cardinality: Cardinality::Singular,
    }
}

const fn repeated(
    name: &'static str,
    json_name: &'static str,
    number: u32,
    kind: FieldKind,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        json_name,
        number,
        kind,
        cardinality: Cardinality::Repeated,
    }
}

/// `tsunami.proto.PluginInfo.PluginType`.
pub static PLUGIN_TYPE: EnumDescriptor = EnumDescriptor {
    name: "PluginType",
    full_name: "tsunami.proto.PluginInfo.PluginType",
    values: &[
        EnumValueDescriptor { name: "PLUGIN_TYPE_UNSPECIFIED", number: 0 },
        EnumValueDescriptor { name: "PORT_SCAN", number: 1 },
        EnumValueDescriptor { name: "SERVICE_FINGERPRINT", number: 2 },
        EnumValueDescriptor { name: "VULN_DETECTION", number: 3 },
    ],
};

/// `tsunami.proto.PluginDefinition`.
pub static PLUGIN_DEFINITION: MessageDescriptor = MessageDescriptor {
    name: "PluginDefinition",
    full_name: "tsunami.proto.PluginDefinition",
    fields: &[
        singular("info", "info", 1, FieldKind::Message("PluginInfo")),
        singular(
            "target_service_name",
            "targetServiceName",
            2,
            FieldKind::Message("TargetServiceName"),
        ),
        singular(
            "target_software",
            "targetSoftware",
            3,
            FieldKind::Message("TargetSoftware"),
        ),
        singular("for_web_service", "forWebService", 4, FieldKind::Bool),
        singular(
            "target_operating_system_class",
            "targetOperatingSystemClass",
            5,
            FieldKind::Message("TargetOperatingSystemClass"),
        ),
    ],
};

/// `tsunami.proto.PluginInfo`.
pub static PLUGIN_INFO: MessageDescriptor = MessageDescriptor {
    name: "PluginInfo",
    full_name: "tsunami.proto.PluginInfo",
    fields: &[
        singular(
            "type",
            "type",
            1,
            FieldKind::Enum("tsunami.proto.PluginInfo.PluginType"),
        ),
        singular("name", "name", 2, FieldKind::String),
        singular("version", "version", 3, FieldKind::String),
        singular("description", "description", 4, FieldKind::String),
        singular("author", "author", 5, FieldKind::String),
    ],
};

/// `tsunami.proto.TargetServiceName`.
pub static TARGET_SERVICE_NAME: MessageDescriptor = MessageDescriptor {
    name: "TargetServiceName",
    full_name: "tsunami.proto.TargetServiceName",
    fields: &[repeated("value", "value", 1, FieldKind::String)],
};

/// `tsunami.proto.TargetSoftware`.
pub static TARGET_SOFTWARE: MessageDescriptor = MessageDescriptor {
    name: "TargetSoftware",
    full_name: "tsunami.proto.TargetSoftware",
    fields: &[
        singular("name", "name", 1, FieldKind::String),
        repeated("value", "value", 2, FieldKind::String),
    ],
};

/// `tsunami.proto.TargetOperatingSystemClass`.
pub static TARGET_OPERATING_SYSTEM_CLASS: MessageDescriptor = MessageDescriptor {
    name: "TargetOperatingSystemClass",
    full_name: "tsunami.proto.TargetOperatingSystemClass",
    fields: &[
        repeated("vendor", "vendor", 1, FieldKind::String),
        repeated("os_family", "osFamily", 2, FieldKind::String),
        singular("min_accuracy", "minAccuracy", 3, FieldKind::UInt32),
    ],
};

/// Every message of the schema, in declaration order.
pub static MESSAGES: &[&MessageDescriptor] = &[
    &PLUGIN_DEFINITION,
    &PLUGIN_INFO,
    &TARGET_SERVICE_NAME,
    &TARGET_SOFTWARE,
    &TARGET_OPERATING_SYSTEM_CLASS,
];

/// Look up a message descriptor by short or fully qualified name.
pub fn message(name: &str) -> Option<&'static MessageDescriptor> {
    MESSAGES
        .iter()
        .copied()
        .find(|m| m.name == name || m.full_name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn full_names_use_package() {
        for message in MESSAGES {
            assert_eq!(message.full_name, format!("{PACKAGE}.{}", message.name));
        }
        assert!(PLUGIN_TYPE.full_name.starts_with(PACKAGE));
    }

    #[test]
    fn tag_numbers_are_unique_per_message() {
        for message in MESSAGES {
            let mut seen = HashSet::new();
            for field in message.fields {
                assert!(
                    seen.insert(field.number),
                    "duplicate tag {} in {}",
                    field.number,
                    message.name
                );
            }
        }
    }

    #[test]
    fn plugin_definition_tags_are_pinned() {
        let tags: Vec<(&str, u32)> = PLUGIN_DEFINITION
            .fields
            .iter()
            .map(|f| (f.name, f.number))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("info", 1),
                ("target_service_name", 2),
                ("target_software", 3),
                ("for_web_service", 4),
                ("target_operating_system_class", 5),
            ]
        );
    }

    #[test]
    fn operating_system_class_tags_are_pinned() {
        let os = &TARGET_OPERATING_SYSTEM_CLASS;
        assert_eq!(os.field_by_name("vendor").map(|f| f.number), Some(1));
        assert_eq!(os.field_by_name("os_family").map(|f| f.number), Some(2));
        assert_eq!(os.field_by_name("min_accuracy").map(|f| f.number), Some(3));
        assert_eq!(os.field(3).map(|f| f.kind), Some(FieldKind::UInt32));
    }

    #[test]
    fn embedded_messages_resolve() {
        for message in MESSAGES {
            for field in message.fields {
                if let FieldKind::Message(name) = field.kind {
                    assert!(super::message(name).is_some(), "unresolved {name}");
                }
            }
        }
    }

    #[test]
    fn plugin_type_values() {
        assert_eq!(PLUGIN_TYPE.name_of(0), Some("PLUGIN_TYPE_UNSPECIFIED"));
        assert_eq!(PLUGIN_TYPE.name_of(3), Some("VULN_DETECTION"));
        assert_eq!(PLUGIN_TYPE.name_of(99), None);
        assert_eq!(PLUGIN_TYPE.number_of("SERVICE_FINGERPRINT"), Some(2));
    }

    #[test]
    fn wire_types_follow_kind() {
        assert_eq!(FieldKind::Bool.wire_type(), WireType::Varint);
        assert_eq!(FieldKind::String.wire_type(), WireType::LengthDelimited);
        assert_eq!(
            FieldKind::Message("PluginInfo").wire_type(),
            WireType::LengthDelimited
        );
    }
}
