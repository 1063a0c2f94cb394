//! Value-Channels und ihr Keeper fuer Compression-Alignment (Spec 9.1, 9.2, 9.3).
//!
//! Unter Compression werden Werte nicht in Dokumentreihenfolge
//! serialisiert, sondern pro (URI, Local-Name) zu Channels gruppiert und
//! blockweise ausgegeben. Dieses Modul besitzt die Channels und
//! entscheidet Gruppierung und Reihenfolge; DEFLATE selbst und die
//! Byte-Montage der Streams liegen beim Aufrufer.
//!
//! Lebenszyklus eines Channels pro Block:
//!
//! ```text
//! unbenutzt ──get_or_create──▶ aktiv (small) ──101. Wert──▶ aktiv (large)
//!      ▲                                                        │
//!      └───────────────── punctuate / Wiederverwendung ◀────────┘
//! ```
//!
//! Channels leben in einer Arena des Keepers und werden ueber
//! [`ChannelId`]-Handles referenziert; der Local-Name-Eintrag der String
//! Table haelt das Handle, die Block-Listen des Keepers referenzieren es
//! nur. So ueberleben Identitaet und Puffer-Kapazitaet jede Blockgrenze
//! ohne Neuallokation.

/// Kanalpuffer einer Session.
///
/// Encoder sammeln ausstehende Text-Werte, Decoder die bereits
/// dekodierten; beide Formen brauchen nur ein kapazitaetserhaltendes
/// Leeren bei Wiederverwendung.
pub trait ChannelStore: Default {
    /// Verwirft den Inhalt, behaelt die Kapazitaet.
    fn clear(&mut self);
}

impl<T> ChannelStore for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self);
    }
}

/// Handle auf einen Channel in der Arena des Keepers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u32);

impl ChannelId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Erste Block-Generation eines Dokuments.
const INITIAL_GENERATION: u32 = 1;

/// Noch nie aktiviert; liegt vor jeder gueltigen Generation.
const NEVER_ACTIVE: u32 = 0;

/// Channels mit hoechstens so vielen Werten gelten als "small" und teilen
/// sich eine Kompressions-Grenze; ab dem 101. Wert bekommt ein Channel
/// seinen eigenen Stream (Spec 9.3).
pub const SMALL_CHANNEL_LIMIT: usize = 100;

/// Werte-Gruppe fuer ein (URI, Local-Name)-Paar innerhalb eines Blocks (Spec 9.2.2).
pub struct Channel<S> {
    uri_id: usize,
    name_id: usize,
    /// Laufende Gesamtzahl des Blocks beim ersten Wert dieses Channels.
    first_position: usize,
    /// Block-Generation der letzten Aktivierung; veraltete Generationen
    /// loesen beim naechsten Zugriff das In-place-Rewind aus.
    generation: u32,
    value_count: usize,
    store: S,
}

impl<S> Channel<S> {
    /// URI-ID des bedienten Namens.
    pub fn uri_id(&self) -> usize {
        self.uri_id
    }

    /// Local-Name-ID des bedienten Namens (innerhalb seiner URI-Partition).
    pub fn name_id(&self) -> usize {
        self.name_id
    }

    /// Ordinalposition des ersten Werts im aktuellen Block.
    pub fn first_position(&self) -> usize {
        self.first_position
    }

    /// Anzahl der in diesem Block gerouteten Werte.
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

/// Besitzt Channel-Arena und Block-Listen; eine Instanz pro Session (Spec 9.1).
pub struct ChannelKeeper<S> {
    arena: Vec<Channel<S>>,
    /// Aktive Channels mit ≤ 100 Werten, in Erst-Aktivierungs-Reihenfolge.
    /// Da Aktivierung beim ersten Wert passiert, ist das zugleich
    /// first_position-Reihenfolge.
    small: Vec<ChannelId>,
    /// Ab dem 101. Wert befoerderte Channels; erst [`finish`](Self::finish)
    /// stellt die first_position-Reihenfolge her.
    large: Vec<ChannelId>,
    /// Laufende Gesamtzahl gerouteter Werte im aktuellen Block.
    total_values: usize,
    generation: u32,
    block_size: u32,
}

impl<S: ChannelStore> ChannelKeeper<S> {
    /// `block_size` muss validiert sein (> 0, siehe
    /// [`DictOptions::validate`](crate::options::DictOptions::validate)).
    pub fn new(block_size: u32) -> Self {
        debug_assert!(block_size > 0);
        Self {
            arena: Vec::new(),
            small: Vec::new(),
            large: Vec::new(),
            total_values: 0,
            generation: INITIAL_GENERATION,
            block_size,
        }
    }

    /// Loest das Channel-Handle eines Local-Name-Eintrags auf.
    ///
    /// Ohne Handle wird ein Channel in der Arena angelegt und das Handle
    /// in `slot` hinterlegt. Traegt der Channel eine veraltete Generation
    /// (voriger Block oder nie aktiv), wird er in place zurueckgespult —
    /// first_position := laufende Gesamtzahl, Wertzaehler := 0, Puffer
    /// kapazitaetserhaltend geleert — und neu in die Small-Liste
    /// eingetragen. Innerhalb desselben Blocks ist der Aufruf idempotent.
    pub fn get_or_create(
        &mut self,
        slot: &mut Option<ChannelId>,
        uri_id: usize,
        name_id: usize,
    ) -> ChannelId {
        let id = match *slot {
            Some(id) => id,
            None => {
                let id = ChannelId(self.arena.len() as u32);
                self.arena.push(Channel {
                    uri_id,
                    name_id,
                    first_position: 0,
                    generation: NEVER_ACTIVE,
                    value_count: 0,
                    store: S::default(),
                });
                *slot = Some(id);
                id
            }
        };

        let channel = &mut self.arena[id.index()];
        if channel.generation != self.generation {
            channel.first_position = self.total_values;
            channel.generation = self.generation;
            channel.value_count = 0;
            channel.store.clear();
            self.small.push(id);
        }
        id
    }

    /// Zaehlt einen Wert auf den Channel und die Block-Gesamtzahl.
    ///
    /// Befoerdert den Channel beim Ueberschreiten von
    /// [`SMALL_CHANNEL_LIMIT`] genau einmal von small nach large.
    /// Gibt genau dann `true` zurueck, wenn die Gesamtzahl soeben die
    /// Blockgroesse erreicht hat — der Aufrufer muss den Block dann
    /// unmittelbar abschliessen.
    pub fn route_value(&mut self, id: ChannelId) -> bool {
        let channel = &mut self.arena[id.index()];
        debug_assert_eq!(
            channel.generation, self.generation,
            "route_value setzt einen im aktuellen Block aktivierten Channel voraus"
        );
        channel.value_count += 1;
        if channel.value_count == SMALL_CHANNEL_LIMIT + 1 {
            // Hoechstens einmal pro Channel und Block.
            if let Some(pos) = self.small.iter().position(|&c| c == id) {
                self.small.remove(pos);
            }
            self.large.push(id);
        }
        self.total_values += 1;
        self.total_values == self.block_size as usize
    }

    /// Stellt vor der Serialisierung die Ausgabereihenfolge her:
    /// Large-Channels aufsteigend nach first_position (Spec 9.3);
    /// die Small-Liste ist durch ihre Pflege bereits sortiert.
    pub fn finish(&mut self) {
        let mut large = std::mem::take(&mut self.large);
        large.sort_by_key(|id| self.arena[id.index()].first_position);
        self.large = large;
    }

    /// Beendet den aktuellen Block: leert beide Listen, nullt die
    /// Gesamtzahl, rueckt die Generation vor. Die Channel-Objekte selbst
    /// bleiben samt Puffern bestehen und werden beim naechsten Zugriff
    /// zurueckgespult.
    pub fn punctuate(&mut self) {
        self.small.clear();
        self.large.clear();
        self.total_values = 0;
        self.generation += 1;
    }

    /// Dokumentbeginn: wie [`punctuate`](Self::punctuate), setzt aber die
    /// Generation auf ihren Anfangswert zurueck und entwertet jede in der
    /// Arena hinterlegte Generation, damit kein Channel des vorigen
    /// Dokuments als aktuell durchgeht.
    pub fn reset(&mut self) {
        self.small.clear();
        self.large.clear();
        self.total_values = 0;
        self.generation = INITIAL_GENERATION;
        for channel in &mut self.arena {
            channel.generation = NEVER_ACTIVE;
        }
    }

    pub fn channel(&self, id: ChannelId) -> &Channel<S> {
        &self.arena[id.index()]
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut Channel<S> {
        &mut self.arena[id.index()]
    }

    /// Aktive Channels mit ≤ 100 Werten, nach first_position.
    pub fn small_channels(&self) -> &[ChannelId] {
        &self.small
    }

    /// Befoerderte Channels; nach [`finish`](Self::finish) nach
    /// first_position sortiert.
    pub fn large_channels(&self) -> &[ChannelId] {
        &self.large
    }

    /// Laufende Gesamtzahl gerouteter Werte im aktuellen Block.
    pub fn total_value_count(&self) -> usize {
        self.total_values
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Anzahl jemals angelegter Channels (Arena-Groesse).
    pub fn channel_count(&self) -> usize {
        self.arena.len()
    }
}
