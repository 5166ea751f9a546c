//! Purpose: Built-in record schemas for the lighting-control tables of a GeniSys database.
//! Exports: `builtin`.
//! Role: Default registry for every opened database; schema files may override entries.
//! Invariants: Table and field names match the legacy database exactly (case-sensitive).
use crate::core::schema::{FieldDef, FieldType, Schema, SchemaRegistry};

use FieldType::{Boolean, Integer, Text};

fn req(name: &str, field_type: FieldType) -> FieldDef {
    FieldDef::required(name, field_type)
}

fn opt(name: &str, field_type: FieldType) -> FieldDef {
    FieldDef::optional(name, field_type)
}

pub fn builtin() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_schema(
            "Phys_Dimmers",
            Schema::new(vec![
                req("Dimmer_ID", Integer),
                req("LoadController", Text),
                req("Zone_ID", Integer),
                req("BoxNumber", Integer),
            ]),
        )
        .with_schema(
            "Phys_Modules",
            Schema::new(vec![
                req("Module_ID", Integer),
                req("Module", Text),
                req("Slot", Integer),
                req("Dimmer_ID", Integer),
            ]),
        )
        .with_schema(
            "Phys_ChannelAlloc",
            Schema::new(vec![
                req("Phys_Channel_ID", Integer),
                req("PhysicalChannel", Integer),
                req("Locked", Boolean),
                req("Module_ID", Integer),
                opt("AreaChannel_ID", Integer),
            ]),
        )
        .with_schema(
            "AreaChannels",
            Schema::new(vec![
                req("AreaChannels_ID", Integer),
                req("Channel", Integer),
                opt("Channelname", Text),
                req("Area", Integer),
                opt("GenisysObject_ID", Integer),
            ]),
        )
        .with_schema(
            "AreaChannelLoads",
            Schema::new(vec![
                req("AreaChannels_ID", Integer),
                opt("Dimming", Boolean),
                opt("Lessthan", Boolean),
                opt("Wattage", Integer),
                opt("Fluoro", Boolean),
                opt("dimming", Boolean),
            ]),
        )
        .with_schema(
            "GenisysZones",
            Schema::new(vec![req("Zone_ID", Integer), req("Zone", Text)]),
        )
        .with_schema(
            "AreaNames",
            Schema::new(vec![
                req("Area", Integer),
                opt("AreaName", Text),
                opt("Timeout", Integer),
                opt("Zone_ID", Integer),
                opt("GeniSysObject_ID", Integer),
            ]),
        )
        .with_schema(
            "GeniSysPanels",
            Schema::new(vec![
                req("Panel_ID", Integer),
                req("Panel", Text),
                req("BoxNumber", Integer),
                req("AnyButtonTurnOn", Boolean),
                req("PanelType", Text),
                opt("PanelConfig", Text),
                req("DeviceCode", Integer),
            ]),
        )
        .with_schema(
            "GeniSysButtonFunctions",
            Schema::new(vec![
                opt("Panel_ID", Integer),
                opt("Button", Integer),
                opt("Function", Text),
                opt("Area", Integer),
                opt("Channel", Integer),
                opt("FadeTime", Integer),
                opt("Engraving", Text),
            ]),
        )
        .with_schema(
            "GeniSysObjects",
            Schema::new(vec![
                opt("Object_ID", Integer),
                opt("Object", Text),
                opt("Area_ID", Integer),
            ]),
        )
        // Parity columns hold either a code or a letter, so they are left untyped.
        .with_schema(
            "Comms",
            Schema::new(vec![
                req("comms", Boolean),
                req("Comport1", Integer),
                req("baud1", Integer),
                req("databits1", Integer),
                req("stopbits1", Integer),
                req("Comport2", Integer),
                req("baud2", Integer),
                req("databits2", Integer),
                req("stopbits2", Integer),
                req("ComPort3", Integer),
                req("ComPort4", Integer),
                req("UseTCP", Boolean),
                req("hostname", Text),
            ]),
        )
}

#[cfg(test)]
mod tests {
    use super::builtin;
    use crate::core::cell::Cell;
    use crate::core::transpose::Record;
    use crate::core::validate::{ValidationOutcome, Validator};

    #[test]
    fn builtin_registry_covers_lighting_tables() {
        let registry = builtin();
        assert_eq!(registry.len(), 11);
        for table in ["Phys_Dimmers", "GenisysZones", "GeniSysPanels", "Comms"] {
            assert!(registry.has_schema(table), "{table}");
        }
        assert!(!registry.has_schema("genisyszones"));
    }

    #[test]
    fn dimmer_rows_coerce_integral_floats() {
        let registry = builtin();
        let record = Record::from_pairs([
            ("Dimmer_ID", Cell::Float(4.0)),
            ("LoadController", Cell::from("LC-2")),
            ("Zone_ID", Cell::Int(1)),
            ("BoxNumber", Cell::Int(3)),
        ]);
        match registry.validator_for("Phys_Dimmers").validate(record) {
            ValidationOutcome::Passed(record) => {
                assert_eq!(record.get("Dimmer_ID"), Some(&Cell::Int(4)));
            }
            other => panic!("expected pass, got {other:?}"),
        }
    }
}
