use std::path::Path;

use ps1_memcard::{ContainerCodec, ContainerFormat, McxKeys, SaveFormat};
use serde::{Deserialize, Serialize};

use crate::Error;

pub const CONFIG_FILE_NAME: &str = "memcard.toml";

/// Settings read from `memcard.toml`.
#[derive(Debug, Clone)]
pub struct Config {
    pub card_format: ContainerFormat,
    pub save_format: SaveFormat,
    pub repair: bool,
    pub mcx_keys: Option<McxKeys>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            card_format: ContainerFormat::Raw,
            save_format: SaveFormat::Raw,
            repair: false,
            mcx_keys: None,
        }
    }
}

mod format_name {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_some(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserialize: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserialize)?;
        s.map(|s| s.parse::<T>().map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(default)]
    card: CardSection,
    #[serde(default)]
    save: SaveSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mcx: Option<McxSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CardSection {
    #[serde(default, with = "format_name", skip_serializing_if = "Option::is_none")]
    default_format: Option<ContainerFormat>,
    #[serde(default)]
    repair: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SaveSection {
    #[serde(default, with = "format_name", skip_serializing_if = "Option::is_none")]
    default_format: Option<SaveFormat>,
}

#[derive(Debug, Deserialize, Serialize)]
struct McxSection {
    key: String,
    iv: String,
}

impl McxSection {
    fn to_keys(&self) -> Result<McxKeys, Error> {
        Ok(McxKeys {
            key: parse_hex_block("key", &self.key)?,
            iv: parse_hex_block("iv", &self.iv)?,
        })
    }
}

fn parse_hex_block(field: &str, text: &str) -> Result<[u8; 16], Error> {
    let bytes = hex::decode(text.trim())
        .map_err(|err| Error::Config(format!("mcx {field}: {err}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        Error::Config(format!(
            "mcx {field} must be 16 bytes, found {}",
            bytes.len()
        ))
    })
}

impl TryFrom<ConfigFile> for Config {
    type Error = Error;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let ConfigFile { card, save, mcx } = file;
        let defaults = Config::default();
        Ok(Self {
            card_format: card.default_format.unwrap_or(defaults.card_format),
            save_format: save.default_format.unwrap_or(defaults.save_format),
            repair: card.repair,
            mcx_keys: mcx.as_ref().map(McxSection::to_keys).transpose()?,
        })
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let file = toml::from_str::<ConfigFile>(text).map_err(|e| Error::Config(e.to_string()))?;
        file.try_into()
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let config_file = ConfigFile {
            card: CardSection {
                default_format: Some(self.card_format),
                repair: self.repair,
            },
            save: SaveSection {
                default_format: Some(self.save_format),
            },
            mcx: self.mcx_keys.as_ref().map(|keys| McxSection {
                key: hex::encode(keys.key),
                iv: hex::encode(keys.iv),
            }),
        };

        toml::to_string_pretty(&config_file)
    }

    /// Container codec carrying this configuration's repair flag and mcx keys.
    pub fn codec(&self) -> ContainerCodec {
        let codec = ContainerCodec::new().with_repair(self.repair);
        match self.mcx_keys {
            Some(keys) => codec.with_mcx_keys(keys),
            None => codec,
        }
    }
}

/// Reads `memcard.toml` from `folder`.
pub fn load_config(folder: &Path) -> Result<Config, Error> {
    let config_file = folder.join(CONFIG_FILE_NAME);
    let bytes = crate::io::read(&config_file)?;
    let text = String::from_utf8(bytes).map_err(|e| Error::Config(e.to_string()))?;
    Config::from_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config.card_format, ContainerFormat::Raw);
        assert_eq!(config.save_format, SaveFormat::Raw);
        assert!(!config.repair);
        assert!(config.mcx_keys.is_none());
    }

    #[test]
    fn format_names_are_case_insensitive() {
        let config = Config::from_toml_str(
            "[card]\ndefault_format = \"GME\"\nrepair = true\n[save]\ndefault_format = \"Mcs\"\n",
        )
        .expect("parse");
        assert_eq!(config.card_format, ContainerFormat::Gme);
        assert_eq!(config.save_format, SaveFormat::Mcs);
        assert!(config.repair);
    }

    #[test]
    fn unknown_format_is_a_config_error() {
        let err = Config::from_toml_str("[card]\ndefault_format = \"psv\"\n").unwrap_err();
        let Error::Config(message) = err else {
            panic!("expected config error, got {err:?}");
        };
        assert!(message.contains("supported: raw gme vgs vmp mcx"), "{message}");
    }

    #[test]
    fn mcx_keys_must_be_sixteen_bytes() {
        let short = "[mcx]\nkey = \"0011\"\niv = \"00112233445566778899aabbccddeeff\"\n";
        assert!(matches!(Config::from_toml_str(short), Err(Error::Config(_))));

        let bad_hex = "[mcx]\nkey = \"zz\"\niv = \"00\"\n";
        assert!(matches!(Config::from_toml_str(bad_hex), Err(Error::Config(_))));
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = Config {
            card_format: ContainerFormat::Mcx,
            save_format: SaveFormat::Ps3,
            repair: true,
            mcx_keys: Some(McxKeys {
                key: [0x11; 16],
                iv: [0x22; 16],
            }),
        };
        let text = config.to_toml_string().expect("serialize");
        assert!(text.contains("default_format = \"mcx\""), "{text}");

        let parsed = Config::from_toml_str(&text).expect("parse");
        assert_eq!(parsed.card_format, ContainerFormat::Mcx);
        assert_eq!(parsed.save_format, SaveFormat::Ps3);
        assert!(parsed.repair);
        let keys = parsed.mcx_keys.expect("keys");
        assert_eq!(keys.key, [0x11; 16]);
        assert_eq!(keys.iv, [0x22; 16]);
    }
}
