//! Anbindung von Element-Grammatiken an Local-Name-Eintraege (Spec 8.4, 8.5).
//!
//! Die Grammatik-Kompilierung selbst lebt ausserhalb dieses Crates; hier
//! liegt nur die Naht: ein Local-Name-Eintrag kann die Start-Grammatik des
//! gleichnamigen globalen Elements tragen. Built-in-Grammatiken lernen
//! waehrend eines Dokuments (Spec 8.4.3), deshalb muss ein Tabellen-Reset
//! die angehaengten Objekte *in place* zuruecksetzen — ihre Identitaet
//! bleibt erhalten, externe Halter behalten gueltige Referenzen.

/// Start-Grammatik eines globalen Elements, anhaengbar an einen
/// Local-Name-Eintrag der String Table.
///
/// Implementoren kapseln ihren gelernten Zustand selbst (typischerweise
/// via `Cell`/`RefCell`, die Tabelle ist single-threaded, Spec-Modell
/// "eine Session, ein Thread").
pub trait ElementGrammar {
    /// Verwirft allen waehrend des Dokuments gelernten Zustand und kehrt
    /// zum schema-abgeleiteten Ausgangszustand zurueck.
    ///
    /// Wird von [`StringTable::reset`](crate::StringTable::reset) fuer
    /// jeden ueberlebenden Eintrag aufgerufen, der eine Grammatik traegt.
    fn reset(&self);
}
