//! Compact-Identifier-Partitionen der String Table (Spec 7.3.1, 7.3.2).
//!
//! Eine Partition vergibt dichte, bei 0 beginnende Integer-IDs an interne
//! Strings. Die Bitbreite der IDs waechst inkrementell mit den Eintraegen
//! (Milestone-Verdopplung statt Neuberechnung), damit der Bit-Writer
//! Feldbreiten in O(1) abfragen kann. URI-, Prefix- und Local-Name-Partitionen teilen sich
//! diese Implementierung; sie unterscheiden sich nur im Eintrags-Payload.
//!
//! Reverse-Lookup (String → ID) existiert nur fuer Encoding-Sessions;
//! Decoding-Sessions greifen rein positional zu. Das ist ein Speicher-
//! Kompromiss, kein semantischer Unterschied: Einfuegen, Breitenwachstum
//! und Reset verhalten sich in beiden Modi identisch.

use crate::FastHashMap;
use std::rc::Rc;

/// Eintrags-Payload, dessen Zustand beim Dokument-Reset zurueckrollt.
///
/// Ueberlebende Eintraege (vor der Baseline angelegt) behalten ihre IDs,
/// aber ihr angehaengter Zustand — verschachtelte Partitionen, gelernte
/// Grammatiken, Value-Slots — faellt auf den Ausgangszustand zurueck.
pub(crate) trait Resettable {
    fn reset(&mut self);
}

impl Resettable for () {
    fn reset(&mut self) {}
}

/// Zustand der Baseline: Stand der Partition nach dem Laden aller
/// Konstruktionszeit-Eintraege (Appendix D + Schema).
#[derive(Debug, Clone, Copy, Default)]
struct Baseline {
    count: usize,
    width: u8,
    milestone: usize,
}

struct PartitionEntry<P> {
    value: Rc<str>,
    payload: P,
}

/// Partition mit kompakten Identifiern (Spec 7.3.1).
///
/// Die Breiten-Invarianten, am Beispiel der Default-Prefix-Partition
/// (ein Baseline-Eintrag `""`), nach 0..7 weiteren Eintraegen:
///
/// ```text
/// Eintraege:        1  2  3  4  5  6  7  8
/// width:            0  1  1  2  2  2  2  3
/// forwarded_width:  1  2  2  3  3  3  3  4
/// ```
///
/// `forwarded_width` ist die Breite des ID-oder-Miss-Felds auf dem Draht:
/// `⌈log₂(n+1)⌉` Bits fuer n Eintraege plus den Miss-Marker 0 (Spec 7.3.2,
/// Treffer werden als `id + 1` geschrieben). `width` haelt den Wert eins
/// darunter und waechst, sobald die Eintragszahl den verdoppelten
/// Milestone erreicht.
pub(crate) struct CompactPartition<P> {
    entries: Vec<PartitionEntry<P>>,
    /// Nur in Encoding-Sessions vorhanden.
    lookup: Option<FastHashMap<Rc<str>, usize>>,
    width: u8,
    /// Eintragszahl beim letzten Breitenwachstum; verdoppelt sich dort.
    milestone: usize,
    baseline: Baseline,
}

impl<P: Resettable> CompactPartition<P> {
    pub(crate) fn new(build_lookup: bool) -> Self {
        Self {
            entries: Vec::new(),
            lookup: build_lookup.then(FastHashMap::default),
            width: 0,
            milestone: 1,
            baseline: Baseline { count: 0, width: 0, milestone: 1 },
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Aktuelle ID-Breite in Bits: `⌊log₂(n)⌋` bei n Eintraegen, 0 wenn leer.
    pub(crate) fn width(&self) -> u8 {
        self.width
    }

    /// Breite nach genau einem weiteren Eintrag: `⌈log₂(n+1)⌉`.
    ///
    /// Das ist die Feldbreite fuer "ID oder Miss" (Spec 7.3.2); Aufrufer
    /// reservieren damit Bits fuer einen moeglicherweise noch unbekannten
    /// Identifier.
    pub(crate) fn forwarded_width(&self) -> u8 {
        if self.entries.is_empty() { 0 } else { self.width + 1 }
    }

    pub(crate) fn get(&self, id: usize) -> Option<&Rc<str>> {
        self.entries.get(id).map(|e| &e.value)
    }

    pub(crate) fn payload(&self, id: usize) -> Option<&P> {
        self.entries.get(id).map(|e| &e.payload)
    }

    pub(crate) fn payload_mut(&mut self, id: usize) -> Option<&mut P> {
        self.entries.get_mut(id).map(|e| &mut e.payload)
    }

    /// Nicht-mutierender Lookup (String → ID).
    ///
    /// # Panics
    ///
    /// In Decoding-Sessions existiert kein Reverse-Lookup; der Aufruf ist
    /// dort ein Fehler der aufrufenden Schicht und schlaegt hart fehl.
    pub(crate) fn lookup(&self, value: &str) -> Option<usize> {
        self.lookup
            .as_ref()
            .expect("reverse lookup is only built for encoding sessions")
            .get(value)
            .copied()
    }

    /// Haengt einen Eintrag an, ohne auf Duplikate zu pruefen.
    ///
    /// Fuer Schema-Seeding und den Decode-Pfad, wo der Aufrufer bereits
    /// weiss, dass der String neu ist.
    pub(crate) fn add_with(&mut self, value: &str, payload: P) -> usize {
        let id = self.entries.len();
        let value: Rc<str> = Rc::from(value);
        if let Some(map) = &mut self.lookup {
            map.insert(Rc::clone(&value), id);
        }
        self.entries.push(PartitionEntry { value, payload });
        self.note_append();
        id
    }

    /// Friert den aktuellen Stand als Baseline ein.
    ///
    /// Genau einmal nach dem Konstruktionszeit-Seeding aufzurufen;
    /// [`reset`](Self::reset) schneidet spaeter auf diesen Stand zurueck.
    pub(crate) fn record_baseline(&mut self) {
        self.baseline = Baseline {
            count: self.entries.len(),
            width: self.width,
            milestone: self.milestone,
        };
    }

    /// Rollt auf die Baseline zurueck: Truncation, kein Einzel-Undo.
    ///
    /// Breite und Milestone kehren exakt auf den eingefrorenen Stand
    /// zurueck; ueberlebende Payloads werden in place zurueckgesetzt;
    /// der Reverse-Lookup wird aus den Ueberlebenden neu aufgebaut.
    pub(crate) fn reset(&mut self) {
        self.entries.truncate(self.baseline.count);
        self.width = self.baseline.width;
        self.milestone = self.baseline.milestone;
        for entry in &mut self.entries {
            entry.payload.reset();
        }
        if let Some(map) = &mut self.lookup {
            map.clear();
            for (id, entry) in self.entries.iter().enumerate() {
                map.insert(Rc::clone(&entry.value), id);
            }
        }
    }

    fn note_append(&mut self) {
        let n = self.entries.len();
        if n == self.milestone << 1 {
            self.milestone = n;
            self.width += 1;
        }
    }
}

impl<P: Resettable + Default> CompactPartition<P> {
    pub(crate) fn add(&mut self, value: &str) -> usize {
        self.add_with(value, P::default())
    }

    /// Liefert die bestehende ID oder haengt neu an (Encoding-Pfad).
    ///
    /// Gibt `(id, added)` zurueck; `added` unterscheidet Treffer von
    /// Neuaufnahme, damit der Aufrufer Hit/Miss auf den Draht bringen kann.
    pub(crate) fn intern(&mut self, value: &str) -> (usize, bool) {
        if let Some(id) = self.lookup(value) {
            return (id, false);
        }
        (self.add(value), true)
    }
}
