//! String Table (Spec 7.3, Appendix D).
//!
//! EXI vergibt "compact identifiers" an wiederkehrende Strings. Die Tabelle
//! ist in Partitionen geteilt: eine URI-Partition, je URI eine Prefix- und
//! eine Local-Name-Partition, und je Local-Name eine Value-Partition, deren
//! Eintraege zusaetzlich in einer globalen Value-Partition stehen (Spec
//! 7.3.1). Prefix- und Local-Name-Partitionen entstehen lazy beim ersten
//! Zugriff.
//!
//! Werte sind zweifach indiziert: ein Treffer in der Partition des
//! anfragenden QName wird als lokaler Hit kodiert, sonst zaehlt der globale
//! Identifier. Die globale Partition kann per valuePartitionCapacity
//! begrenzt werden; ist sie voll, verdraengt jeder neue Eintrag den
//! aeltesten mitsamt seinem lokalen Slot (Spec 7.3.3).
//!
//! Lifecycle: eine Tabelle pro Session. [`StringTable::reset`] rollt
//! zwischen zwei Dokumenten derselben Session auf den Seed-Stand zurueck;
//! die Konstruktionszeit-Eintraege (Appendix D plus Schema) ueberleben mit
//! unveraenderten IDs, alles Gelernte faellt weg.

use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::FastHashMap;
use crate::bit_width;
use crate::channel::ChannelId;
use crate::grammar::ElementGrammar;
use crate::options::{DictOptions, ValueCapacity};
use crate::partition::{CompactPartition, Resettable};

/// Default-URI (Appendix D): kein Namespace.
pub const URI_EMPTY: &str = "";
/// Default-URI (Appendix D): XML-Namespace.
pub const URI_XML: &str = "http://www.w3.org/XML/1998/namespace";
/// Default-URI (Appendix D): XML-Schema-Instance-Namespace.
pub const URI_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// XML-Schema-Namespace; nur in schema-informierten Tabellen vorhanden.
pub const URI_XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Compact ID von [`URI_EMPTY`].
pub const URI_ID_EMPTY: usize = 0;
/// Compact ID von [`URI_XML`].
pub const URI_ID_XML: usize = 1;
/// Compact ID von [`URI_XSI`].
pub const URI_ID_XSI: usize = 2;
/// Compact ID von [`URI_XSD`] in schema-informierten Tabellen.
pub const URI_ID_XSD: usize = 3;

/// Built-in-Typnamen des XML-Schema-Namespace (Appendix D.3), bereits
/// lexikographisch sortiert. Schema-informierte Tabellen seeden sie vor
/// den Namen aus dem Schema selbst.
pub const XSD_BUILTIN_TYPES: [&str; 46] = [
    "ENTITIES",
    "ENTITY",
    "ID",
    "IDREF",
    "IDREFS",
    "NCName",
    "NMTOKEN",
    "NMTOKENS",
    "NOTATION",
    "Name",
    "QName",
    "anySimpleType",
    "anyType",
    "anyURI",
    "base64Binary",
    "boolean",
    "byte",
    "date",
    "dateTime",
    "decimal",
    "double",
    "duration",
    "float",
    "gDay",
    "gMonth",
    "gMonthDay",
    "gYear",
    "gYearMonth",
    "hexBinary",
    "int",
    "integer",
    "language",
    "long",
    "negativeInteger",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "normalizedString",
    "positiveInteger",
    "short",
    "string",
    "time",
    "token",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

/// Session-Richtung; zur Konstruktionszeit festgelegt.
///
/// Encoding-Sessions pflegen Reverse-Lookups (String → ID) fuer alle
/// Partitionen; Decoding-Sessions greifen rein positional zu und tragen
/// die Hash-Maps gar nicht erst. Einfuegen, Breitenwachstum und Reset
/// verhalten sich in beiden Modi identisch, beide Seiten leiten also
/// dieselbe Tabelle ab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Reverse-Lookups vorhanden; `encode_*` und `lookup_*` nutzbar.
    Encode,
    /// Rein positional; `encode_*`/`lookup_*` schlagen hart fehl.
    Decode,
}

impl SessionMode {
    /// True fuer Encoding-Sessions.
    pub fn is_encode(self) -> bool {
        matches!(self, SessionMode::Encode)
    }
}

/// Ergebnis eines Compact-ID-Zugriffs (Spec 7.3.2, URI- und
/// Prefix-Partitionen). Auf dem Draht steht ein Treffer als `id + 1`,
/// die 0 markiert den Miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactIdResult {
    /// String war vorhanden; enthaelt die bestehende ID.
    Hit(usize),
    /// String war neu und wurde aufgenommen; enthaelt die neue ID.
    Miss(usize),
}

/// Ergebnis eines String-Literal-Zugriffs (Spec 7.3.3, Local-Name-
/// Partitionen): der Miss wird als Literal kodiert, der Treffer als ID
/// mit `⌈log₂(m)⌉` Bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringLiteralResult {
    /// String war vorhanden; enthaelt die bestehende ID.
    Hit(usize),
    /// String war neu und wurde aufgenommen.
    Miss,
}

/// Ergebnis eines Value-Zugriffs (Spec 7.3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueResult {
    /// Treffer in der lokalen Partition des anfragenden QName.
    HitLocal(usize),
    /// Treffer in der globalen Partition (anderer QName).
    HitGlobal(usize),
    /// Nicht vorhanden; je nach Optionen aufgenommen worden.
    Miss,
}

/// Schema-abgeleitete Seed-Strings fuer [`StringTable::from_schema`].
///
/// Die Reihenfolge im Seed spielt keine Rolle: URIs und Namen werden beim
/// Aufbau dedupliziert und lexikographisch sortiert (Appendix D.3), damit
/// Encoder und Decoder unabhaengig voneinander identische IDs ableiten.
#[derive(Clone, Default)]
pub struct SchemaSeed {
    /// Namespaces des Schemas mitsamt ihren Element-/Attributnamen.
    pub uris: Vec<UriSeed>,
}

/// Ein Namespace aus dem Schema.
#[derive(Clone, Default)]
pub struct UriSeed {
    /// Namespace-URI.
    pub uri: String,
    /// Local Names unter diesem Namespace.
    pub local_names: Vec<NameSeed>,
}

impl UriSeed {
    pub fn new(uri: impl Into<String>, local_names: Vec<NameSeed>) -> Self {
        Self { uri: uri.into(), local_names }
    }
}

/// Ein Local Name aus dem Schema, optional mit der Start-Grammatik des
/// gleichnamigen globalen Elements.
#[derive(Clone, Default)]
pub struct NameSeed {
    pub name: String,
    pub grammar: Option<Rc<dyn ElementGrammar>>,
}

impl NameSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), grammar: None }
    }

    pub fn with_grammar(name: impl Into<String>, grammar: Rc<dyn ElementGrammar>) -> Self {
        Self { name: name.into(), grammar: Some(grammar) }
    }
}

/// Lokale Value-Partition eines Local-Name-Eintrags (Spec 7.3.3).
///
/// Reiner positionaler Speicher ohne eigenen Lookup; gesucht wird ueber
/// den zentralen `value_lookup` der Tabelle. IDs werden nie wiederverwendet:
/// verdraengte Eintraege hinterlassen ein Loch, die Breite zaehlt weiterhin
/// alle je vergebenen IDs.
struct LocalValues {
    entries: Vec<Option<Rc<str>>>,
    width: u8,
    /// Eintragszahl, bei deren Erreichen die Breite als naechstes waechst.
    milestone: usize,
}

impl Default for LocalValues {
    fn default() -> Self {
        Self { entries: Vec::new(), width: 0, milestone: 1 }
    }
}

impl LocalValues {
    /// Haengt einen Wert an und liefert seine lokale ID.
    ///
    /// Die Breite waechst vor dem Anhaengen auf `⌈log₂(n)⌉`, sobald die
    /// bisherige Eintragszahl den Milestone erreicht (1, 2, 4, 8, ...).
    fn add(&mut self, value: Rc<str>) -> usize {
        if self.entries.len() == self.milestone {
            self.width += 1;
            self.milestone <<= 1;
        }
        let id = self.entries.len();
        self.entries.push(Some(value));
        id
    }

    fn get(&self, id: usize) -> Option<&str> {
        self.entries.get(id)?.as_deref()
    }

    /// Raeumt einen verdraengten Slot; die ID bleibt vergeben.
    fn clear_slot(&mut self, id: usize) {
        if let Some(entry) = self.entries.get_mut(id) {
            *entry = None;
        }
    }

    /// Anzahl je vergebener IDs, inklusive Loecher.
    fn assigned(&self) -> usize {
        self.entries.len()
    }

    fn width(&self) -> u8 {
        self.width
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.width = 0;
        self.milestone = 1;
    }
}

/// Eintrag der globalen Value-Partition mit Rueckverweis auf seinen
/// lokalen Slot, damit die Verdraengung beide Seiten in einem Zug raeumt.
struct GlobalEntry {
    value: Rc<str>,
    uri_id: usize,
    name_id: usize,
    local_id: usize,
}

/// Globale Value-Partition (Spec 7.3.3), optional kapazitaetsbegrenzt.
///
/// Begrenzte Partitionen vergeben IDs im Ring: ist die Kapazitaet
/// erreicht, faellt `next_id` auf 0 zurueck und jeder neue Eintrag
/// verdraengt den Bestand an seiner Position. Die Breite waechst bis
/// `⌈log₂(capacity)⌉` und bleibt nach dem ersten Umlauf eingefroren.
///
/// `capacity == None` deckt sowohl unbegrenzte Partitionen ab als auch
/// den deaktivierten Fall; bei deaktiviertem Caching filtert die Tabelle
/// jeden Eintrag vor dem Store weg.
struct GlobalValues {
    slots: Vec<Option<GlobalEntry>>,
    next_id: usize,
    /// Live-Eintraege (ohne Loecher).
    live: usize,
    width: u8,
    milestone: usize,
    capacity: Option<usize>,
    wrapped: bool,
}

impl GlobalValues {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
            live: 0,
            width: 0,
            milestone: 1,
            capacity,
            wrapped: false,
        }
    }

    fn is_bounded(&self) -> bool {
        self.capacity.is_some()
    }

    /// Slot, den der naechste Eintrag belegt; bei begrenzten Partitionen
    /// muss der Aufrufer ihn vorher raeumen.
    fn next_slot(&self) -> usize {
        self.next_id
    }

    fn width(&self) -> u8 {
        self.width
    }

    fn len(&self) -> usize {
        self.live
    }

    fn get(&self, id: usize) -> Option<&GlobalEntry> {
        self.slots.get(id)?.as_ref()
    }

    /// Nimmt den Eintrag am Slot heraus (None, falls leer oder unbelegt).
    fn take_slot(&mut self, slot: usize) -> Option<GlobalEntry> {
        let taken = self.slots.get_mut(slot)?.take();
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    fn add(&mut self, entry: GlobalEntry) -> usize {
        let id = self.next_id;
        match self.capacity {
            None => {
                self.grow_width();
                self.slots.push(Some(entry));
                self.next_id += 1;
            }
            Some(cap) => {
                if !self.wrapped {
                    self.grow_width();
                }
                // Lazy wachsen: die konfigurierte Kapazitaet kommt aus dem
                // Header und darf keine Vorab-Allokation ausloesen.
                if id >= self.slots.len() {
                    self.slots.resize_with(id + 1, || None);
                }
                debug_assert!(self.slots[id].is_none(), "slot must be evicted before reuse");
                self.slots[id] = Some(entry);
                self.next_id = (self.next_id + 1) % cap;
                if self.next_id == 0 && !self.wrapped {
                    self.wrapped = true;
                    debug!(
                        "globale Value-Partition hat Kapazitaet {cap} erreicht; \
                         aelteste Eintraege werden ab jetzt verdraengt"
                    );
                }
            }
        }
        self.live += 1;
        id
    }

    /// `⌈log₂(n)⌉`-Wachstum vor dem Anhaengen; nach dem Wrap eingefroren.
    fn grow_width(&mut self) {
        if self.next_id == self.milestone {
            self.width += 1;
            self.milestone <<= 1;
        }
    }

    fn reset(&mut self) {
        self.slots.clear();
        self.next_id = 0;
        self.live = 0;
        self.width = 0;
        self.milestone = 1;
        self.wrapped = false;
    }
}

/// Payload eines Local-Name-Eintrags: lokale Values, optional die
/// Grammatik des gleichnamigen globalen Elements und der Channel-Handle
/// der Kompressionsschicht.
#[derive(Default)]
struct NameScope {
    grammar: Option<Rc<dyn ElementGrammar>>,
    channel: Option<ChannelId>,
    values: LocalValues,
}

impl Resettable for NameScope {
    fn reset(&mut self) {
        if let Some(grammar) = &self.grammar {
            grammar.reset();
        }
        self.values.clear();
        // Der Channel-Handle bleibt: Generationen invalidiert der
        // ChannelKeeper selbst, der Handle wird beim naechsten Zugriff
        // in place zurueckgespult.
    }
}

/// Payload eines URI-Eintrags: die untergeordneten Partitionen, lazy
/// angelegt beim ersten Zugriff.
#[derive(Default)]
struct UriScope {
    local_names: Option<CompactPartition<NameScope>>,
    prefixes: Option<CompactPartition<()>>,
}

impl Resettable for UriScope {
    fn reset(&mut self) {
        if let Some(names) = &mut self.local_names {
            names.reset();
        }
        if let Some(prefixes) = &mut self.prefixes {
            prefixes.reset();
        }
    }
}

/// String Table: URI-, Prefix-, Local-Name- und Value-Partitionen einer
/// Session (Spec 7.3).
///
/// Zugriffe laufen ueber die `encode_*`-Methoden (Lookup-oder-Aufnahme in
/// einem Schritt, liefern die Feldbreite vor der Aufnahme mit) bzw. die
/// positionalen `get_*`/`add_*`-Methoden des Decode-Pfads. Ungueltige IDs
/// sind Aufruferfehler und schlagen hart fehl; die Pruefung korrupter
/// Draht-Indizes ist Sache des Bit-Lesers davor.
pub struct StringTable {
    uris: CompactPartition<UriScope>,
    global_values: GlobalValues,
    /// Wert → globale ID; nur in Encoding-Sessions vorhanden.
    value_lookup: Option<FastHashMap<Rc<str>, usize>>,
    mode: SessionMode,
    value_capacity: ValueCapacity,
    value_max_length: Option<u32>,
}

impl StringTable {
    /// Schema-lose Tabelle mit den Appendix-D-Defaults: drei URIs, deren
    /// Default-Praefixe und die Local Names von `xml` und `xsi`.
    pub fn new(mode: SessionMode, options: &DictOptions) -> Self {
        Self::from_schema(&SchemaSeed::default(), mode, options)
    }

    /// Schema-informierte Tabelle: Appendix-D-Defaults, dann der
    /// XML-Schema-Namespace mit seinen Built-in-Typnamen, dann die
    /// Namespaces des Schemas in sortierter Reihenfolge.
    ///
    /// Ein leerer Seed ergibt die schema-lose Tabelle (ohne `xsd`-URI).
    pub fn from_schema(seed: &SchemaSeed, mode: SessionMode, options: &DictOptions) -> Self {
        let build_lookup = mode.is_encode();
        let capacity = match options.effective_value_capacity() {
            ValueCapacity::Bounded(cap) => Some(cap as usize),
            // Disabled filtert should_skip_value; der Store bleibt leer.
            ValueCapacity::Unbounded | ValueCapacity::Disabled => None,
        };
        let mut table = Self {
            uris: CompactPartition::new(build_lookup),
            global_values: GlobalValues::new(capacity),
            value_lookup: build_lookup.then(FastHashMap::default),
            mode,
            value_capacity: options.effective_value_capacity(),
            value_max_length: options.value_max_length(),
        };
        table.seed_defaults();
        table.seed_schema(seed);
        table.record_baselines();
        table
    }

    /// Session-Richtung dieser Tabelle.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Effektive valuePartitionCapacity dieser Tabelle.
    pub fn value_capacity(&self) -> ValueCapacity {
        self.value_capacity
    }

    // ---------------------------------------------------------------
    // Seeding
    // ---------------------------------------------------------------

    /// Appendix D.1/D.2: die drei Default-URIs mit Praefixen und den
    /// Local Names von `xml` und `xsi`.
    fn seed_defaults(&mut self) {
        let empty = self.add_uri(URI_EMPTY);
        self.add_prefix(empty, "");
        let xml = self.add_uri(URI_XML);
        self.add_prefix(xml, "xml");
        for name in ["base", "id", "lang", "space"] {
            self.add_local_name(xml, name);
        }
        let xsi = self.add_uri(URI_XSI);
        self.add_prefix(xsi, "xsi");
        for name in ["nil", "type"] {
            self.add_local_name(xsi, name);
        }
        debug_assert_eq!((empty, xml, xsi), (URI_ID_EMPTY, URI_ID_XML, URI_ID_XSI));
    }

    /// Appendix D.3: XSD-Built-ins plus Schema-Inhalt, dedupliziert und
    /// sortiert. Laeuft rein positional, damit Encode- und Decode-Seite
    /// garantiert identische IDs ableiten.
    fn seed_schema(&mut self, seed: &SchemaSeed) {
        if seed.uris.is_empty() {
            return;
        }

        let xsd = self.add_uri(URI_XSD);
        debug_assert_eq!(xsd, URI_ID_XSD);

        let mut by_uri: BTreeMap<&str, BTreeMap<&str, Option<Rc<dyn ElementGrammar>>>> =
            BTreeMap::new();
        by_uri.insert(URI_XSD, XSD_BUILTIN_TYPES.iter().map(|name| (*name, None)).collect());
        for uri_seed in &seed.uris {
            let names = by_uri.entry(uri_seed.uri.as_str()).or_default();
            for name_seed in &uri_seed.local_names {
                names.insert(name_seed.name.as_str(), name_seed.grammar.clone());
            }
        }

        for (uri, names) in &by_uri {
            let uri_id = match self.find_uri(uri) {
                Some(id) => id,
                None => self.add_uri(uri),
            };
            for (name, grammar) in names {
                let name_id = match self.find_local_name(uri_id, name) {
                    Some(id) => id,
                    None => self.add_local_name(uri_id, name),
                };
                if let Some(grammar) = grammar {
                    self.bind_grammar(uri_id, name_id, Rc::clone(grammar));
                }
            }
        }
    }

    /// Friert den Seed-Stand aller bestehenden Partitionen als Baseline
    /// ein; [`reset`](Self::reset) schneidet spaeter darauf zurueck.
    fn record_baselines(&mut self) {
        self.uris.record_baseline();
        for uri_id in 0..self.uris.len() {
            let scope = self.uris.payload_mut(uri_id).expect("uri ids are dense");
            if let Some(names) = &mut scope.local_names {
                names.record_baseline();
            }
            if let Some(prefixes) = &mut scope.prefixes {
                prefixes.record_baseline();
            }
        }
    }

    /// Lineare URI-Suche; nur fuers Seeding, das modusunabhaengig bleiben
    /// muss (Decoding-Sessions haben keinen Reverse-Lookup).
    fn find_uri(&self, uri: &str) -> Option<usize> {
        (0..self.uris.len()).find(|&id| self.uris.get(id).is_some_and(|v| &**v == uri))
    }

    /// Lineare Local-Name-Suche; nur fuers Seeding.
    fn find_local_name(&self, uri_id: usize, name: &str) -> Option<usize> {
        let names = self.local_names(uri_id)?;
        (0..names.len()).find(|&id| names.get(id).is_some_and(|v| &**v == name))
    }

    // ---------------------------------------------------------------
    // Encode-Pfad: Lookup-oder-Aufnahme mit Feldbreite
    // ---------------------------------------------------------------

    /// URI-Zugriff (Spec 7.3.2). Liefert das Ergebnis und die Breite des
    /// ID-oder-Miss-Felds, wie sie *vor* einer etwaigen Aufnahme galt.
    pub fn encode_uri(&mut self, uri: &str) -> (CompactIdResult, u8) {
        let width = self.uris.forwarded_width();
        let (id, added) = self.uris.intern(uri);
        let result =
            if added { CompactIdResult::Miss(id) } else { CompactIdResult::Hit(id) };
        (result, width)
    }

    /// Prefix-Zugriff unter einer URI (Spec 7.3.2). Die Prefix-Partition
    /// entsteht beim ersten Zugriff; bei einer leeren Partition ist das
    /// Feld 0 Bits breit (nur der Miss ist moeglich).
    pub fn encode_prefix(&mut self, uri_id: usize, prefix: &str) -> (CompactIdResult, u8) {
        let prefixes = self.prefixes_mut(uri_id);
        let width = prefixes.forwarded_width();
        let (id, added) = prefixes.intern(prefix);
        let result =
            if added { CompactIdResult::Miss(id) } else { CompactIdResult::Hit(id) };
        (result, width)
    }

    /// Local-Name-Zugriff unter einer URI (Spec 7.3.3). Die mitgelieferte
    /// Breite ist die des Treffer-ID-Felds (`⌈log₂(m)⌉` fuer m Eintraege)
    /// vor einer etwaigen Aufnahme; der Miss selbst wird als Literal
    /// kodiert.
    pub fn encode_local_name(&mut self, uri_id: usize, name: &str) -> (StringLiteralResult, u8) {
        let names = self.local_names_mut(uri_id);
        let width = bit_width::for_count(names.len());
        let (id, added) = names.intern(name);
        let result =
            if added { StringLiteralResult::Miss } else { StringLiteralResult::Hit(id) };
        (result, width)
    }

    /// Value-Zugriff (Spec 7.3.3): prueft lokale und globale Partition in
    /// einem Hash-Zugriff und nimmt den Wert bei einem Miss auf, sofern
    /// die Optionen es erlauben (Kapazitaet, valueMaxLength, leere
    /// Strings bleiben draussen).
    ///
    /// Liefert `(ergebnis, globale_breite, lokale_breite)`; beide Breiten
    /// sind die vor der Aufnahme gueltigen ID-Feldbreiten.
    pub fn encode_value(
        &mut self,
        uri_id: usize,
        name_id: usize,
        value: &str,
    ) -> (ValueResult, u8, u8) {
        let global_width = self.global_values.width();
        let local_width = self.local_value_width(uri_id, name_id);

        let lookup = self
            .value_lookup
            .as_ref()
            .expect("value lookup is only built for encoding sessions");
        let hash = lookup.hasher().hash_one(value);
        if let Some((_, &global_id)) =
            lookup.raw_entry().from_hash(hash, |k| k.as_ref() == value)
        {
            let entry = self
                .global_values
                .get(global_id)
                .expect("value lookup must reference a live global slot");
            let result = if entry.uri_id == uri_id && entry.name_id == name_id {
                ValueResult::HitLocal(entry.local_id)
            } else {
                ValueResult::HitGlobal(global_id)
            };
            return (result, global_width, local_width);
        }

        if self.should_skip_value(value) {
            return (ValueResult::Miss, global_width, local_width);
        }

        if self.global_values.is_bounded() {
            self.evict_slot(self.global_values.next_slot());
        }
        let value_rc: Rc<str> = Rc::from(value);
        let local_id = self.name_scope_mut(uri_id, name_id).values.add(Rc::clone(&value_rc));
        let global_id = self.global_values.add(GlobalEntry {
            value: Rc::clone(&value_rc),
            uri_id,
            name_id,
            local_id,
        });
        // Derselbe Hash wie beim Lookup oben: ein Hash-Durchlauf pro Wert.
        self.value_lookup
            .as_mut()
            .expect("value lookup is only built for encoding sessions")
            .raw_entry_mut()
            .from_hash(hash, |k| k.as_ref() == value)
            .or_insert(value_rc, global_id);

        (ValueResult::Miss, global_width, local_width)
    }

    /// Nicht-mutierender Value-Lookup; nur in Encoding-Sessions.
    pub fn lookup_value(&self, uri_id: usize, name_id: usize, value: &str) -> ValueResult {
        let lookup = self
            .value_lookup
            .as_ref()
            .expect("value lookup is only built for encoding sessions");
        match lookup.get(value) {
            Some(&global_id) => {
                let entry = self
                    .global_values
                    .get(global_id)
                    .expect("value lookup must reference a live global slot");
                if entry.uri_id == uri_id && entry.name_id == name_id {
                    ValueResult::HitLocal(entry.local_id)
                } else {
                    ValueResult::HitGlobal(global_id)
                }
            }
            None => ValueResult::Miss,
        }
    }

    /// Nicht-mutierender URI-Lookup; nur in Encoding-Sessions.
    pub fn lookup_uri(&self, uri: &str) -> Option<usize> {
        self.uris.lookup(uri)
    }

    /// Nicht-mutierender Prefix-Lookup; nur in Encoding-Sessions.
    pub fn lookup_prefix(&self, uri_id: usize, prefix: &str) -> Option<usize> {
        self.uris.payload(uri_id)?.prefixes.as_ref()?.lookup(prefix)
    }

    /// Nicht-mutierender Local-Name-Lookup; nur in Encoding-Sessions.
    pub fn lookup_local_name(&self, uri_id: usize, name: &str) -> Option<usize> {
        self.local_names(uri_id)?.lookup(name)
    }

    // ---------------------------------------------------------------
    // Decode-Pfad: positionales Lesen und Lernen
    // ---------------------------------------------------------------

    pub fn get_uri(&self, uri_id: usize) -> Option<&str> {
        self.uris.get(uri_id).map(AsRef::as_ref)
    }

    pub fn get_prefix(&self, uri_id: usize, prefix_id: usize) -> Option<&str> {
        self.uris
            .payload(uri_id)?
            .prefixes
            .as_ref()?
            .get(prefix_id)
            .map(AsRef::as_ref)
    }

    pub fn get_local_name(&self, uri_id: usize, name_id: usize) -> Option<&str> {
        self.local_names(uri_id)?.get(name_id).map(AsRef::as_ref)
    }

    /// Globaler Value per ID; None fuer verdraengte oder nie belegte Slots.
    pub fn get_global_value(&self, global_id: usize) -> Option<&str> {
        self.global_values.get(global_id).map(|entry| entry.value.as_ref())
    }

    /// Lokaler Value per ID; None fuer verdraengte Slots.
    pub fn get_local_value(&self, uri_id: usize, name_id: usize, local_id: usize) -> Option<&str> {
        self.name_scope(uri_id, name_id)?.values.get(local_id)
    }

    /// Haengt eine URI an; der Aufrufer weiss, dass sie neu ist (Draht-Miss
    /// bzw. Seeding).
    pub fn add_uri(&mut self, uri: &str) -> usize {
        self.uris.add(uri)
    }

    /// Haengt einen Prefix unter einer URI an.
    pub fn add_prefix(&mut self, uri_id: usize, prefix: &str) -> usize {
        self.prefixes_mut(uri_id).add(prefix)
    }

    /// Haengt einen Local Name unter einer URI an.
    pub fn add_local_name(&mut self, uri_id: usize, name: &str) -> usize {
        self.local_names_mut(uri_id).add(name)
    }

    /// Nimmt einen Wert nach einem Draht-Miss auf; wendet dieselben
    /// Filter- und Verdraengungsregeln an wie [`encode_value`]
    /// (Self::encode_value), damit beide Seiten dieselbe Partition
    /// ableiten. In Encoding-Sessions idempotent.
    pub fn add_value(&mut self, uri_id: usize, name_id: usize, value: &str) {
        if self.should_skip_value(value) {
            return;
        }
        if let Some(lookup) = &self.value_lookup
            && lookup.contains_key(value)
        {
            return;
        }

        if self.global_values.is_bounded() {
            self.evict_slot(self.global_values.next_slot());
        }
        let value_rc: Rc<str> = Rc::from(value);
        let local_id = self.name_scope_mut(uri_id, name_id).values.add(Rc::clone(&value_rc));
        let global_id = self.global_values.add(GlobalEntry {
            value: Rc::clone(&value_rc),
            uri_id,
            name_id,
            local_id,
        });
        if let Some(lookup) = &mut self.value_lookup {
            lookup.insert(value_rc, global_id);
        }
    }

    // ---------------------------------------------------------------
    // Grammatiken und Channels
    // ---------------------------------------------------------------

    /// Haengt die Start-Grammatik des globalen Elements an einen
    /// Local-Name-Eintrag (Spec 8.4/8.5).
    pub fn bind_grammar(&mut self, uri_id: usize, name_id: usize, grammar: Rc<dyn ElementGrammar>) {
        self.name_scope_mut(uri_id, name_id).grammar = Some(grammar);
    }

    /// Grammatik eines Local-Name-Eintrags, falls gebunden.
    pub fn grammar(&self, uri_id: usize, name_id: usize) -> Option<Rc<dyn ElementGrammar>> {
        self.name_scope(uri_id, name_id)?.grammar.clone()
    }

    /// Channel-Handle-Slot eines Local-Name-Eintrags; gedacht als
    /// `slot`-Argument fuer `ChannelKeeper::get_or_create`.
    pub fn channel_slot_mut(&mut self, uri_id: usize, name_id: usize) -> &mut Option<ChannelId> {
        &mut self.name_scope_mut(uri_id, name_id).channel
    }

    /// Channel-Handle eines Local-Name-Eintrags, falls je einer vergeben
    /// wurde; kann auf eine abgelaufene Generation zeigen.
    pub fn channel_of(&self, uri_id: usize, name_id: usize) -> Option<ChannelId> {
        self.name_scope(uri_id, name_id)?.channel
    }

    // ---------------------------------------------------------------
    // Groessen und Breiten
    // ---------------------------------------------------------------

    pub fn uri_count(&self) -> usize {
        self.uris.len()
    }

    pub fn prefix_count(&self, uri_id: usize) -> usize {
        self.uris
            .payload(uri_id)
            .and_then(|scope| scope.prefixes.as_ref())
            .map_or(0, CompactPartition::len)
    }

    pub fn local_name_count(&self, uri_id: usize) -> usize {
        self.local_names(uri_id).map_or(0, CompactPartition::len)
    }

    /// Live-Eintraege der globalen Value-Partition.
    pub fn global_value_count(&self) -> usize {
        self.global_values.len()
    }

    /// Je vergebene lokale Value-IDs, inklusive verdraengter Loecher.
    pub fn local_value_count(&self, uri_id: usize, name_id: usize) -> usize {
        self.name_scope(uri_id, name_id).map_or(0, |scope| scope.values.assigned())
    }

    /// Aktuelle Breite reiner URI-Hit-IDs, `⌊log₂(n)⌋`.
    pub fn uri_width(&self) -> u8 {
        self.uris.width()
    }

    /// Breite des URI-ID-oder-Miss-Felds (Spec 7.3.2).
    pub fn uri_forwarded_width(&self) -> u8 {
        self.uris.forwarded_width()
    }

    /// Aktuelle Breite reiner Prefix-Hit-IDs unter einer URI.
    pub fn prefix_width(&self, uri_id: usize) -> u8 {
        self.uris
            .payload(uri_id)
            .and_then(|scope| scope.prefixes.as_ref())
            .map_or(0, CompactPartition::width)
    }

    /// Breite des Prefix-ID-oder-Miss-Felds unter einer URI (Spec 7.3.2).
    pub fn prefix_forwarded_width(&self, uri_id: usize) -> u8 {
        self.uris
            .payload(uri_id)
            .and_then(|scope| scope.prefixes.as_ref())
            .map_or(0, CompactPartition::forwarded_width)
    }

    /// Breite des Local-Name-Treffer-Felds unter einer URI (Spec 7.3.3).
    pub fn local_name_width(&self, uri_id: usize) -> u8 {
        bit_width::for_count(self.local_name_count(uri_id))
    }

    /// Breite des globalen Value-ID-Felds (Spec 7.3.3); bei begrenzten
    /// Partitionen nach dem ersten Umlauf eingefroren.
    pub fn global_value_width(&self) -> u8 {
        self.global_values.width()
    }

    /// Breite des lokalen Value-ID-Felds eines Local-Name-Eintrags.
    pub fn local_value_width(&self, uri_id: usize, name_id: usize) -> u8 {
        self.name_scope(uri_id, name_id).map_or(0, |scope| scope.values.width())
    }

    // ---------------------------------------------------------------
    // Reset
    // ---------------------------------------------------------------

    /// Rollt die Tabelle auf den Seed-Stand zurueck (Dokumentgrenze).
    ///
    /// Gelernte URIs, Namen, Praefixe und saemtliche Values fallen weg;
    /// ueberlebende Eintraege behalten ihre IDs, ihre Breiten und
    /// Wachstums-Milestones kehren exakt auf den eingefrorenen Stand
    /// zurueck. Gebundene Grammatiken werden in place zurueckgesetzt,
    /// externe Referenzen auf sie bleiben gueltig.
    pub fn reset(&mut self) {
        trace!("String Table rollt auf den Seed-Stand zurueck");
        self.uris.reset();
        self.global_values.reset();
        if let Some(lookup) = &mut self.value_lookup {
            lookup.clear();
        }
    }

    // ---------------------------------------------------------------
    // Interna
    // ---------------------------------------------------------------

    fn local_names(&self, uri_id: usize) -> Option<&CompactPartition<NameScope>> {
        self.uris.payload(uri_id)?.local_names.as_ref()
    }

    fn local_names_mut(&mut self, uri_id: usize) -> &mut CompactPartition<NameScope> {
        let build_lookup = self.mode.is_encode();
        self.uris
            .payload_mut(uri_id)
            .expect("unknown uri id")
            .local_names
            .get_or_insert_with(|| CompactPartition::new(build_lookup))
    }

    fn prefixes_mut(&mut self, uri_id: usize) -> &mut CompactPartition<()> {
        let build_lookup = self.mode.is_encode();
        self.uris
            .payload_mut(uri_id)
            .expect("unknown uri id")
            .prefixes
            .get_or_insert_with(|| CompactPartition::new(build_lookup))
    }

    fn name_scope(&self, uri_id: usize, name_id: usize) -> Option<&NameScope> {
        self.uris.payload(uri_id)?.local_names.as_ref()?.payload(name_id)
    }

    fn name_scope_mut(&mut self, uri_id: usize, name_id: usize) -> &mut NameScope {
        self.uris
            .payload_mut(uri_id)
            .expect("unknown uri id")
            .local_names
            .as_mut()
            .expect("uri has no local name partition")
            .payload_mut(name_id)
            .expect("unknown local name id")
    }

    /// Spec 7.3.3: leere Strings und Werte ueber valueMaxLength werden
    /// nie aufgenommen; Kapazitaet 0 schaltet das Caching komplett ab.
    ///
    /// valueMaxLength zaehlt Zeichen, nicht Bytes. Der Byte-Laengen-Check
    /// vorweg erspart dem haeufigen Fall (kurzer Wert) das Durchzaehlen.
    fn should_skip_value(&self, value: &str) -> bool {
        if matches!(self.value_capacity, ValueCapacity::Disabled) || value.is_empty() {
            return true;
        }
        match self.value_max_length {
            Some(max) => {
                let max = max as usize;
                value.len() > max && value.chars().count() > max
            }
            None => false,
        }
    }

    /// Raeumt einen globalen Slot vor der Wiederbelegung: Lookup-Eintrag,
    /// globaler Slot und der rueckverwiesene lokale Slot in einem Zug.
    fn evict_slot(&mut self, slot: usize) {
        if let Some(old) = self.global_values.take_slot(slot) {
            if let Some(lookup) = &mut self.value_lookup {
                lookup.remove(&old.value);
            }
            self.name_scope_mut(old.uri_id, old.name_id)
                .values
                .clear_slot(old.local_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKeeper;
    use crate::grammar::testing::CountingGrammar;

    fn encode_table() -> StringTable {
        StringTable::new(SessionMode::Encode, &DictOptions::default())
    }

    fn bounded_table(cap: i32) -> StringTable {
        let options = DictOptions::default().with_value_partition_capacity(cap);
        StringTable::new(SessionMode::Encode, &options)
    }

    fn example_seed() -> SchemaSeed {
        SchemaSeed {
            uris: vec![
                UriSeed::new(
                    "urn:lager",
                    vec![NameSeed::new("artikel"), NameSeed::new("preis")],
                ),
                UriSeed::new("urn:kunde", vec![NameSeed::new("name")]),
            ],
        }
    }

    // ==================== Appendix-D-Seeding ====================

    #[test]
    fn default_table_matches_appendix_d() {
        let t = encode_table();
        assert_eq!(t.uri_count(), 3);
        assert_eq!(t.get_uri(URI_ID_EMPTY), Some(URI_EMPTY));
        assert_eq!(t.get_uri(URI_ID_XML), Some(URI_XML));
        assert_eq!(t.get_uri(URI_ID_XSI), Some(URI_XSI));
        assert_eq!(t.get_uri(3), None);

        assert_eq!(t.prefix_count(URI_ID_EMPTY), 1);
        assert_eq!(t.get_prefix(URI_ID_EMPTY, 0), Some(""));
        assert_eq!(t.lookup_prefix(URI_ID_XML, "xml"), Some(0));
        assert_eq!(t.lookup_prefix(URI_ID_XSI, "xsi"), Some(0));

        assert_eq!(t.local_name_count(URI_ID_EMPTY), 0);
        assert_eq!(t.local_name_count(URI_ID_XML), 4);
        assert_eq!(t.get_local_name(URI_ID_XML, 0), Some("base"));
        assert_eq!(t.get_local_name(URI_ID_XML, 3), Some("space"));
        assert_eq!(t.local_name_count(URI_ID_XSI), 2);
        assert_eq!(t.lookup_local_name(URI_ID_XSI, "nil"), Some(0));
        assert_eq!(t.lookup_local_name(URI_ID_XSI, "type"), Some(1));
    }

    #[test]
    fn schema_table_seeds_xsd_builtins() {
        let t = StringTable::from_schema(
            &example_seed(),
            SessionMode::Encode,
            &DictOptions::default(),
        );
        assert_eq!(t.get_uri(URI_ID_XSD), Some(URI_XSD));
        assert_eq!(t.local_name_count(URI_ID_XSD), 46);
        assert_eq!(t.lookup_local_name(URI_ID_XSD, "ENTITIES"), Some(0));
        assert_eq!(t.lookup_local_name(URI_ID_XSD, "anySimpleType"), Some(11));
        assert_eq!(t.lookup_local_name(URI_ID_XSD, "unsignedShort"), Some(45));
    }

    /// Seed-Reihenfolge ist egal: URIs und Namen landen sortiert.
    #[test]
    fn schema_seeding_sorts_and_dedupes() {
        let seed = SchemaSeed {
            uris: vec![
                UriSeed::new("urn:zebra", vec![NameSeed::new("zwei"), NameSeed::new("eins")]),
                UriSeed::new("urn:apfel", vec![NameSeed::new("eins")]),
                UriSeed::new("urn:zebra", vec![NameSeed::new("eins")]),
            ],
        };
        let t = StringTable::from_schema(&seed, SessionMode::Encode, &DictOptions::default());

        assert_eq!(t.uri_count(), 6);
        assert_eq!(t.get_uri(4), Some("urn:apfel"));
        assert_eq!(t.get_uri(5), Some("urn:zebra"));
        assert_eq!(t.local_name_count(5), 2);
        assert_eq!(t.get_local_name(5, 0), Some("eins"));
        assert_eq!(t.get_local_name(5, 1), Some("zwei"));
    }

    /// Eigene Namen im XSD-Namespace werden in die Built-ins einsortiert.
    #[test]
    fn schema_names_merge_into_xsd_builtins() {
        let seed = SchemaSeed {
            uris: vec![UriSeed::new(URI_XSD, vec![NameSeed::new("anfang")])],
        };
        let t = StringTable::from_schema(&seed, SessionMode::Encode, &DictOptions::default());
        assert_eq!(t.local_name_count(URI_ID_XSD), 47);
        assert_eq!(t.lookup_local_name(URI_ID_XSD, "anfang"), Some(11));
        assert_eq!(t.lookup_local_name(URI_ID_XSD, "anySimpleType"), Some(12));
    }

    #[test]
    fn schema_seeding_binds_grammars() {
        let grammar = Rc::new(CountingGrammar::default());
        let seed = SchemaSeed {
            uris: vec![UriSeed::new(
                "urn:lager",
                vec![NameSeed::with_grammar("artikel", Rc::clone(&grammar) as _)],
            )],
        };
        let t = StringTable::from_schema(&seed, SessionMode::Encode, &DictOptions::default());
        let uri = t.lookup_uri("urn:lager").unwrap();
        let name = t.lookup_local_name(uri, "artikel").unwrap();
        assert!(t.grammar(uri, name).is_some());
        assert!(t.grammar(URI_ID_XML, 0).is_none());
    }

    /// Encoder und Decoder muessen aus demselben Seed identische IDs
    /// ableiten, sonst redet der Draht aneinander vorbei.
    #[test]
    fn seeding_is_identical_across_modes() {
        let seed = example_seed();
        let enc = StringTable::from_schema(&seed, SessionMode::Encode, &DictOptions::default());
        let dec = StringTable::from_schema(&seed, SessionMode::Decode, &DictOptions::default());

        assert_eq!(enc.uri_count(), dec.uri_count());
        for uri_id in 0..enc.uri_count() {
            assert_eq!(enc.get_uri(uri_id), dec.get_uri(uri_id));
            assert_eq!(enc.prefix_count(uri_id), dec.prefix_count(uri_id));
            assert_eq!(enc.local_name_count(uri_id), dec.local_name_count(uri_id));
            for name_id in 0..enc.local_name_count(uri_id) {
                assert_eq!(
                    enc.get_local_name(uri_id, name_id),
                    dec.get_local_name(uri_id, name_id)
                );
            }
        }
    }

    // ==================== URIs und Praefixe ====================

    #[test]
    fn encode_uri_hit_miss_and_widths() {
        let mut t = encode_table();
        // 3 Eintraege: ID-oder-Miss-Feld ist ceil(log2(4)) = 2 Bits breit.
        assert_eq!(t.uri_width(), 1);
        assert_eq!(t.uri_forwarded_width(), 2);
        assert_eq!(t.encode_uri(URI_EMPTY), (CompactIdResult::Hit(0), 2));
        assert_eq!(t.encode_uri("urn:doc"), (CompactIdResult::Miss(3), 2));
        assert_eq!(t.uri_width(), 2);
        assert_eq!(t.uri_forwarded_width(), 3);
        assert_eq!(t.encode_uri("urn:doc"), (CompactIdResult::Hit(3), 3));
        assert_eq!(t.get_uri(3), Some("urn:doc"));
    }

    #[test]
    fn encode_prefix_on_learned_uri_starts_empty() {
        let mut t = encode_table();
        let (result, _) = t.encode_uri("urn:doc");
        let CompactIdResult::Miss(uri_id) = result else {
            panic!("expected miss, got {result:?}");
        };
        assert_eq!(t.prefix_count(uri_id), 0);
        // Leere Partition: 0 Bits, nur der Miss ist moeglich.
        assert_eq!(t.encode_prefix(uri_id, "d"), (CompactIdResult::Miss(0), 0));
        assert_eq!(t.encode_prefix(uri_id, "d"), (CompactIdResult::Hit(0), 1));
        assert_eq!(t.encode_prefix(uri_id, "d2"), (CompactIdResult::Miss(1), 1));
    }

    #[test]
    fn default_prefix_partition_width_growth() {
        let mut t = encode_table();
        // Ein Baseline-Eintrag ("xml"): Folgen aus Spec 7.3.2.
        let hit_widths = [0u8, 1, 1, 2, 2, 2, 2, 3];
        let forwarded = [1u8, 2, 2, 3, 3, 3, 3, 4];
        assert_eq!(t.prefix_width(URI_ID_XML), hit_widths[0]);
        assert_eq!(t.prefix_forwarded_width(URI_ID_XML), forwarded[0]);
        for i in 1..8 {
            t.add_prefix(URI_ID_XML, &format!("p{i}"));
            assert_eq!(
                t.prefix_width(URI_ID_XML),
                hit_widths[i],
                "nach {i} zusaetzlichen Praefixen"
            );
            assert_eq!(
                t.prefix_forwarded_width(URI_ID_XML),
                forwarded[i],
                "nach {i} zusaetzlichen Praefixen"
            );
        }
    }

    // ==================== Local Names ====================

    #[test]
    fn encode_local_name_hit_miss_and_widths() {
        let mut t = encode_table();
        // 4 xml-Namen: Treffer-Feld ist ceil(log2(4)) = 2 Bits breit.
        assert_eq!(t.local_name_width(URI_ID_XML), 2);
        assert_eq!(t.encode_local_name(URI_ID_XML, "base"), (StringLiteralResult::Hit(0), 2));
        assert_eq!(t.encode_local_name(URI_ID_XML, "custom"), (StringLiteralResult::Miss, 2));
        // Jetzt 5 Namen: ceil(log2(5)) = 3.
        assert_eq!(t.local_name_width(URI_ID_XML), 3);
        assert_eq!(t.encode_local_name(URI_ID_XML, "custom"), (StringLiteralResult::Hit(4), 3));
    }

    #[test]
    fn local_names_on_learned_uri() {
        let mut t = encode_table();
        let uri_id = t.add_uri("urn:doc");
        assert_eq!(t.local_name_count(uri_id), 0);
        assert_eq!(t.local_name_width(uri_id), 0);
        assert_eq!(t.encode_local_name(uri_id, "a"), (StringLiteralResult::Miss, 0));
        assert_eq!(t.get_local_name(uri_id, 0), Some("a"));
    }

    // ==================== Values: Treffer-Arten ====================

    #[test]
    fn value_miss_then_local_hit() {
        let mut t = encode_table();
        let (result, global_w, local_w) = t.encode_value(URI_ID_XML, 0, "wert");
        assert_eq!((result, global_w, local_w), (ValueResult::Miss, 0, 0));

        let (result, global_w, local_w) = t.encode_value(URI_ID_XML, 0, "wert");
        assert_eq!(result, ValueResult::HitLocal(0));
        // Je ein Eintrag: beide ID-Felder bleiben bei 0 Bits.
        assert_eq!((global_w, local_w), (0, 0));
        assert_eq!(t.get_local_value(URI_ID_XML, 0, 0), Some("wert"));
        assert_eq!(t.get_global_value(0), Some("wert"));
    }

    #[test]
    fn value_hit_from_other_qname_is_global() {
        let mut t = encode_table();
        t.encode_value(URI_ID_XML, 0, "geteilt");
        let (result, _, _) = t.encode_value(URI_ID_XSI, 0, "geteilt");
        assert_eq!(result, ValueResult::HitGlobal(0));
        // Ein globaler Hit legt keine lokale Kopie an; der naechste
        // Zugriff desselben QName bleibt global.
        assert_eq!(t.local_value_count(URI_ID_XSI, 0), 0);
        let (result, _, _) = t.encode_value(URI_ID_XSI, 0, "geteilt");
        assert_eq!(result, ValueResult::HitGlobal(0));
    }

    #[test]
    fn lookup_value_does_not_mutate() {
        let mut t = encode_table();
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "wert"), ValueResult::Miss);
        assert_eq!(t.global_value_count(), 0);

        t.encode_value(URI_ID_XML, 0, "wert");
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "wert"), ValueResult::HitLocal(0));
        assert_eq!(t.lookup_value(URI_ID_XSI, 0, "wert"), ValueResult::HitGlobal(0));
        assert_eq!(t.global_value_count(), 1);
    }

    // ==================== Values: Breitenwachstum ====================

    /// Beide Value-ID-Felder wachsen mit ceil(log2(n)) ueber die Anzahl
    /// vergebener IDs.
    #[test]
    fn value_widths_grow_with_ceil_log2() {
        let mut t = encode_table();
        let expected = [0u8, 0, 1, 2, 2, 3, 3, 3, 3];
        for (i, want) in expected.iter().enumerate() {
            let (result, global_w, local_w) = t.encode_value(URI_ID_XML, 0, &format!("v{i}"));
            assert_eq!(result, ValueResult::Miss);
            assert_eq!(global_w, *want, "globale Breite vor Eintrag {i}");
            assert_eq!(local_w, *want, "lokale Breite vor Eintrag {i}");
        }
        assert_eq!(t.global_value_width(), 4);
        assert_eq!(t.local_value_width(URI_ID_XML, 0), 4);
        assert_eq!(t.global_value_count(), 9);
        // Unbegrenzt: nichts faellt raus, jeder Wert bleibt auffindbar.
        for i in 0..9 {
            assert_eq!(
                t.lookup_value(URI_ID_XML, 0, &format!("v{i}")),
                ValueResult::HitLocal(i)
            );
        }
    }

    // ==================== Begrenzte Kapazitaet und Eviction ====================

    #[test]
    fn bounded_partition_evicts_oldest_first() {
        let mut t = bounded_table(4);
        for i in 0..4 {
            t.encode_value(URI_ID_XML, 0, &format!("v{i}"));
        }
        assert_eq!(t.global_value_count(), 4);

        // Fuenfter Wert verdraengt v0: globaler Slot 0 wird neu belegt,
        // der lokale Slot bleibt als Loch zurueck.
        t.encode_value(URI_ID_XML, 0, "v4");
        assert_eq!(t.global_value_count(), 4);
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "v0"), ValueResult::Miss);
        assert_eq!(t.get_global_value(0), Some("v4"));
        assert_eq!(t.get_local_value(URI_ID_XML, 0, 0), None);
        assert_eq!(t.get_local_value(URI_ID_XML, 0, 4), Some("v4"));
        for i in 1..4 {
            assert_eq!(
                t.lookup_value(URI_ID_XML, 0, &format!("v{i}")),
                ValueResult::HitLocal(i),
                "v{i} muss den Umlauf ueberleben"
            );
        }
    }

    #[test]
    fn bounded_width_freezes_after_wrap() {
        let mut t = bounded_table(4);
        for i in 0..4 {
            t.encode_value(URI_ID_XML, 0, &format!("v{i}"));
        }
        assert_eq!(t.global_value_width(), 2);
        for i in 4..11 {
            t.encode_value(URI_ID_XML, 0, &format!("v{i}"));
        }
        assert_eq!(t.global_value_width(), 2);
        assert_eq!(t.global_value_count(), 4);
    }

    #[test]
    fn capacity_one_keeps_only_latest() {
        let mut t = bounded_table(1);
        t.encode_value(URI_ID_XML, 0, "a");
        t.encode_value(URI_ID_XML, 0, "b");
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "a"), ValueResult::Miss);
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "b"), ValueResult::HitLocal(1));
        assert_eq!(t.global_value_width(), 0);
        assert_eq!(t.global_value_count(), 1);
    }

    /// Verdraengung raeumt den lokalen Slot auch dann, wenn er einem
    /// anderen QName gehoert als dem gerade einfuegenden.
    #[test]
    fn eviction_clears_local_slot_of_other_qname() {
        let mut t = bounded_table(3);
        t.encode_value(URI_ID_XML, 0, "a1");
        t.encode_value(URI_ID_XML, 0, "a2");
        t.encode_value(URI_ID_XSI, 0, "b1");

        // Voll; der naechste Wert von xsi verdraengt xml:base/"a1".
        t.encode_value(URI_ID_XSI, 0, "b2");
        assert_eq!(t.get_local_value(URI_ID_XML, 0, 0), None);
        assert_eq!(t.get_local_value(URI_ID_XML, 0, 1), Some("a2"));
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "a1"), ValueResult::Miss);
        assert_eq!(t.lookup_value(URI_ID_XSI, 0, "b1"), ValueResult::HitLocal(0));
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "b1"), ValueResult::HitGlobal(2));
    }

    // ==================== Deaktiviertes Caching und Filter ====================

    #[test]
    fn capacity_zero_disables_value_caching() {
        let mut t = bounded_table(0);
        for _ in 0..3 {
            let (result, global_w, local_w) = t.encode_value(URI_ID_XML, 0, "wert");
            assert_eq!((result, global_w, local_w), (ValueResult::Miss, 0, 0));
        }
        assert_eq!(t.global_value_count(), 0);
        assert_eq!(t.local_value_count(URI_ID_XML, 0), 0);
    }

    #[test]
    fn empty_strings_are_never_cached() {
        let mut t = encode_table();
        assert_eq!(t.encode_value(URI_ID_XML, 0, "").0, ValueResult::Miss);
        assert_eq!(t.encode_value(URI_ID_XML, 0, "").0, ValueResult::Miss);
        assert_eq!(t.global_value_count(), 0);
    }

    /// valueMaxLength zaehlt Zeichen: 4 Umlaute sind 8 Bytes, aber 4
    /// Zeichen, und passen unter ein Limit von 4.
    #[test]
    fn value_max_length_counts_chars_not_bytes() {
        let options = DictOptions::default().with_value_max_length(4);
        let mut t = StringTable::new(SessionMode::Encode, &options);

        assert_eq!(t.encode_value(URI_ID_XML, 0, "abcde").0, ValueResult::Miss);
        assert_eq!(t.encode_value(URI_ID_XML, 0, "abcde").0, ValueResult::Miss);
        assert_eq!(t.global_value_count(), 0);

        assert_eq!(t.encode_value(URI_ID_XML, 0, "äöüß").0, ValueResult::Miss);
        assert_eq!(t.encode_value(URI_ID_XML, 0, "äöüß").0, ValueResult::HitLocal(0));
        assert_eq!(t.encode_value(URI_ID_XML, 0, "abcd").0, ValueResult::Miss);
        assert_eq!(t.global_value_count(), 2);
    }

    // ==================== Reset ====================

    #[test]
    fn reset_restores_seed_state_exactly() {
        let seed = example_seed();
        let mut t = StringTable::from_schema(&seed, SessionMode::Encode, &DictOptions::default());
        let fresh = StringTable::from_schema(&seed, SessionMode::Encode, &DictOptions::default());

        let lager = t.lookup_uri("urn:lager").unwrap();
        t.encode_uri("urn:gelernt");
        t.encode_local_name(lager, "zusatz");
        t.encode_prefix(lager, "lg");
        t.encode_value(lager, 0, "wert");
        assert_ne!(t.uri_count(), fresh.uri_count());

        t.reset();

        assert_eq!(t.uri_count(), fresh.uri_count());
        assert_eq!(t.uri_forwarded_width(), fresh.uri_forwarded_width());
        assert_eq!(t.lookup_uri("urn:gelernt"), None);
        assert_eq!(t.local_name_count(lager), fresh.local_name_count(lager));
        assert_eq!(t.lookup_local_name(lager, "zusatz"), None);
        assert_eq!(t.prefix_count(lager), 0);
        assert_eq!(t.global_value_count(), 0);
        assert_eq!(t.global_value_width(), 0);
        assert_eq!(t.local_value_count(lager, 0), 0);
        assert_eq!(t.lookup_value(lager, 0, "wert"), ValueResult::Miss);

        // Ueberlebende IDs bleiben stabil, Neuaufnahmen dicht.
        assert_eq!(t.lookup_uri("urn:lager"), Some(lager));
        assert_eq!(t.add_uri("urn:gelernt"), fresh.uri_count());
    }

    /// Nach dem Reset waechst die Breite wieder von vorn; der alte
    /// Wrap-Zustand einer begrenzten Partition ueberlebt nicht.
    #[test]
    fn reset_clears_wrap_state() {
        let mut t = bounded_table(2);
        for i in 0..3 {
            t.encode_value(URI_ID_XML, 0, &format!("v{i}"));
        }
        t.reset();

        t.encode_value(URI_ID_XML, 0, "x");
        t.encode_value(URI_ID_XML, 0, "y");
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "x"), ValueResult::HitLocal(0));
        assert_eq!(t.lookup_value(URI_ID_XML, 0, "y"), ValueResult::HitLocal(1));
        assert_eq!(t.global_value_width(), 1);
    }

    #[test]
    fn reset_resets_bound_grammars_in_place() {
        let grammar = Rc::new(CountingGrammar::default());
        let seed = SchemaSeed {
            uris: vec![UriSeed::new(
                "urn:lager",
                vec![NameSeed::with_grammar("artikel", Rc::clone(&grammar) as _)],
            )],
        };
        let mut t = StringTable::from_schema(&seed, SessionMode::Encode, &DictOptions::default());
        grammar.learn();
        grammar.learn();
        assert_eq!(grammar.learned(), 2);

        t.reset();
        assert_eq!(grammar.resets(), 1);
        assert_eq!(grammar.learned(), 0);

        // Dieselbe Instanz haengt weiter am Eintrag.
        let uri = t.lookup_uri("urn:lager").unwrap();
        assert!(t.grammar(uri, 0).is_some());
    }

    #[test]
    fn reset_keeps_channel_handles() {
        let mut t = encode_table();
        let mut keeper: ChannelKeeper<Vec<u32>> = ChannelKeeper::new(1000);
        let id = keeper.get_or_create(t.channel_slot_mut(URI_ID_XML, 0), URI_ID_XML, 0);
        assert_eq!(t.channel_of(URI_ID_XML, 0), Some(id));

        t.reset();
        // Der Handle bleibt; seine Generation verwaltet der Keeper.
        assert_eq!(t.channel_of(URI_ID_XML, 0), Some(id));
    }

    #[test]
    fn repeated_reset_is_idempotent() {
        let mut t = encode_table();
        t.encode_uri("urn:doc");
        t.encode_value(URI_ID_XML, 0, "wert");
        t.reset();
        let after_first = (t.uri_count(), t.uri_forwarded_width(), t.global_value_count());
        t.reset();
        assert_eq!(
            (t.uri_count(), t.uri_forwarded_width(), t.global_value_count()),
            after_first
        );
    }

    // ==================== Decode-Modus ====================

    #[test]
    fn decode_mode_learns_positionally() {
        let mut t = StringTable::new(SessionMode::Decode, &DictOptions::default());
        let uri = t.add_uri("urn:doc");
        let name = t.add_local_name(uri, "a");
        t.add_prefix(uri, "d");
        t.add_value(uri, name, "wert");

        assert_eq!(t.get_uri(uri), Some("urn:doc"));
        assert_eq!(t.get_prefix(uri, 0), Some("d"));
        assert_eq!(t.get_local_name(uri, name), Some("a"));
        assert_eq!(t.get_global_value(0), Some("wert"));
        assert_eq!(t.get_local_value(uri, name, 0), Some("wert"));
    }

    #[test]
    fn decode_mode_eviction_without_lookup() {
        let options = DictOptions::default().with_value_partition_capacity(2);
        let mut t = StringTable::new(SessionMode::Decode, &options);
        for value in ["a", "b", "c"] {
            t.add_value(URI_ID_XML, 0, value);
        }
        assert_eq!(t.get_local_value(URI_ID_XML, 0, 0), None);
        assert_eq!(t.get_global_value(0), Some("c"));
        assert_eq!(t.get_global_value(1), Some("b"));
        assert_eq!(t.global_value_count(), 2);
    }

    #[test]
    fn decode_mode_add_value_respects_filters() {
        let options = DictOptions::default().with_value_max_length(2);
        let mut t = StringTable::new(SessionMode::Decode, &options);
        t.add_value(URI_ID_XML, 0, "");
        t.add_value(URI_ID_XML, 0, "zu lang");
        assert_eq!(t.global_value_count(), 0);
        t.add_value(URI_ID_XML, 0, "ok");
        assert_eq!(t.global_value_count(), 1);
    }

    #[test]
    #[should_panic(expected = "encoding sessions")]
    fn decode_mode_rejects_uri_lookup() {
        let t = StringTable::new(SessionMode::Decode, &DictOptions::default());
        let _ = t.lookup_uri(URI_XML);
    }

    #[test]
    #[should_panic(expected = "encoding sessions")]
    fn decode_mode_rejects_encode_value() {
        let mut t = StringTable::new(SessionMode::Decode, &DictOptions::default());
        let _ = t.encode_value(URI_ID_XML, 0, "wert");
    }

    // ==================== Channel- und Grammatik-Anbindung ====================

    #[test]
    fn channel_slot_is_wired_through_keeper() {
        let mut t = encode_table();
        let mut keeper: ChannelKeeper<Vec<u32>> = ChannelKeeper::new(1000);
        assert_eq!(t.channel_of(URI_ID_XML, 0), None);

        let first = keeper.get_or_create(t.channel_slot_mut(URI_ID_XML, 0), URI_ID_XML, 0);
        let again = keeper.get_or_create(t.channel_slot_mut(URI_ID_XML, 0), URI_ID_XML, 0);
        assert_eq!(first, again);
        assert_eq!(keeper.channel_count(), 1);
    }

    #[test]
    fn bind_grammar_after_construction() {
        let mut t = encode_table();
        let grammar = Rc::new(CountingGrammar::default());
        t.bind_grammar(URI_ID_XSI, 1, Rc::clone(&grammar) as _);
        assert!(t.grammar(URI_ID_XSI, 1).is_some());
        t.reset();
        assert_eq!(grammar.resets(), 1);
    }
}
