//! exidict – String-Table- und Channel-Kern fuer EXI 1.0 (W3C Second Edition)
//!
//! Der Dictionary-Kern eines EXI-Codecs: String-Table-Partitionen mit
//! kompakten Identifiern (Spec 7.3), die kapazitaetsbegrenzte Value-
//! Partition mit Ring-Verdraengung und die Value-Channels der
//! Kompressionsschicht (Spec 9). Bit-I/O, Grammatik-Kompilierung und
//! Event-Verarbeitung liegen ausserhalb; dieses Crate haelt den geteilten
//! Zustand, den Encoder und Decoder unabhaengig voneinander identisch
//! ableiten muessen.
//!
//! # Beispiel
//!
//! ```
//! use exidict::{
//!     ChannelKeeper, CompactIdResult, DictOptions, SessionMode, StringLiteralResult,
//!     StringTable, ValueResult,
//! };
//!
//! let options = DictOptions::default().with_value_partition_capacity(64);
//! options.validate().unwrap();
//!
//! let mut table = StringTable::new(SessionMode::Encode, &options);
//! let mut channels: ChannelKeeper<Vec<String>> = ChannelKeeper::new(options.block_size());
//!
//! // Erste Begegnung mit einem QName: URI und Local Name sind Misses.
//! let (uri, uri_width) = table.encode_uri("urn:beispiel");
//! let CompactIdResult::Miss(uri_id) = uri else { unreachable!() };
//! assert_eq!(uri_width, 2); // drei Appendix-D-URIs -> 2-Bit-Feld
//! let (name, _) = table.encode_local_name(uri_id, "preis");
//! assert_eq!(name, StringLiteralResult::Miss);
//! let name_id = table.local_name_count(uri_id) - 1;
//!
//! // Der Wert wandert in die Value-Partition und in den Channel des QName.
//! let (value, _, _) = table.encode_value(uri_id, name_id, "9,99");
//! assert_eq!(value, ValueResult::Miss);
//! let channel =
//!     channels.get_or_create(table.channel_slot_mut(uri_id, name_id), uri_id, name_id);
//! channels.channel_mut(channel).store_mut().push("9,99".to_string());
//! assert!(!channels.route_value(channel));
//!
//! // Wiederholung desselben Werts: jetzt ein lokaler Treffer.
//! assert_eq!(table.encode_value(uri_id, name_id, "9,99").0, ValueResult::HitLocal(0));
//! ```

pub mod bit_width;
pub mod channel;
pub mod error;
pub mod grammar;
pub mod options;
mod partition;
pub mod string_table;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent — für interne Datenstrukturen).
/// Nutzt hashbrown direkt für die raw_entry API (ein Hash-Durchlauf pro Value-Zugriff).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

// Public API: String Table
pub use string_table::{
    CompactIdResult, NameSeed, SchemaSeed, SessionMode, StringLiteralResult, StringTable,
    UriSeed, ValueResult,
};

// Public API: Options
pub use options::{DictOptions, ValueCapacity};

// Public API: Channels
pub use channel::{Channel, ChannelId, ChannelKeeper, ChannelStore, SMALL_CHANNEL_LIMIT};

// Public API: Grammatik-Naht
pub use grammar::ElementGrammar;
