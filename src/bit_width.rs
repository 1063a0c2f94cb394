//! Bitbreiten-Berechnung fuer String-Table-Felder (Spec 7.3).
//!
//! `⌈log₂(n)⌉` — die Anzahl Bits, um `n` unterschiedliche Werte zu
//! unterscheiden. Wird von Konsumenten benutzt, die Feldbreiten aus
//! Partitionsgroessen ableiten (Local-Name- und Value-Treffer, Spec 7.3.3),
//! und von Tests als Gegenprobe zur inkrementellen Breitenpflege.

/// Anzahl Bits fuer `n` unterschiedliche Werte: `⌈log₂(n)⌉`.
///
/// - `n = 0` oder `n = 1`: 0 Bits
/// - `n = 2`: 1 Bit
/// - `n = 3..4`: 2 Bits
/// - `n = 5..8`: 3 Bits
/// - usw.
#[inline]
pub fn for_count(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spec 7.3.3: ceil(log2(n))
    #[test]
    fn grundwerte() {
        assert_eq!(for_count(0), 0);
        assert_eq!(for_count(1), 0);
        assert_eq!(for_count(2), 1);
        assert_eq!(for_count(3), 2);
        assert_eq!(for_count(4), 2);
        assert_eq!(for_count(5), 3);
        assert_eq!(for_count(8), 3);
        assert_eq!(for_count(9), 4);
        assert_eq!(for_count(16), 4);
        assert_eq!(for_count(17), 5);
        assert_eq!(for_count(100), 7);
        assert_eq!(for_count(256), 8);
        assert_eq!(for_count(257), 9);
    }

    /// Stichproben entlang der Zweierpotenz-Grenzen, wo die Breite kippt.
    #[test]
    fn grenzen_an_zweierpotenzen() {
        for exp in 1..=20u32 {
            let n = 1usize << exp;
            assert_eq!(for_count(n), exp as u8, "n = 2^{exp}");
            assert_eq!(for_count(n + 1), exp as u8 + 1, "n = 2^{exp} + 1");
        }
    }
}
