//! Offline fallback replies.

use std::sync::Mutex;

use rand::Rng;

use crate::random::RandomSource;

/// Appended to every fallback reply so students can tell it apart from a
/// generated one.
pub const OFFLINE_MARKER: &str = " _(modo sin conexión)_";

/// Canned mentor-style replies. Each one asks instead of telling.
pub static DEFAULT_FALLBACK_REPLIES: &[&str] = &[
    "🤔 Buena pregunta. ¿Qué habéis probado hasta ahora y qué resultado os ha dado?",
    "Interesante. ¿Qué pasaría si lo miráis desde el punto de vista de quien va a usar vuestro proyecto?",
    "Antes de seguir, ¿qué sabéis ya seguro y qué es solo una suposición?",
    "¿Podéis dividir el problema en pasos más pequeños? ¿Cuál sería el primero? 💡",
    "Me gusta hacia dónde vais. ¿Qué evidencia os ayudaría a decidir entre las opciones?",
    "¿Qué haría falta para que cada miembro del grupo pueda aportar algo distinto?",
    "Imaginad que ya lo habéis terminado: ¿qué os gustaría poder enseñar? ✨",
    "¿Qué parte os está costando más y por qué creéis que es así?",
];

/// Fixed, read-only pool of fallback replies, safe to share across sessions.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPool {
    entries: &'static [&'static str],
}

impl Default for FallbackPool {
    fn default() -> Self {
        Self {
            entries: DEFAULT_FALLBACK_REPLIES,
        }
    }
}

impl FallbackPool {
    /// Build a pool from a static list. An empty list falls back to the
    /// default entries so the pool can never be empty.
    pub fn new(entries: &'static [&'static str]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        Self { entries }
    }

    pub fn entries(&self) -> &'static [&'static str] {
        self.entries
    }

    /// Pick an entry uniformly at random.
    pub fn pick(&self, rng: &Mutex<RandomSource>) -> &'static str {
        let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = rng.random_range(0..self.entries.len());
        self.entries[index]
    }

    /// A random entry with the offline marker appended.
    pub fn offline_reply(&self, rng: &Mutex<RandomSource>) -> String {
        format!("{}{}", self.pick(rng), OFFLINE_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded;

    #[test]
    fn test_default_pool_not_empty() {
        let pool = FallbackPool::default();
        assert!(!pool.entries().is_empty());
        assert!(pool.entries().iter().all(|e| !e.trim().is_empty()));
    }

    #[test]
    fn test_empty_pool_uses_defaults() {
        let pool = FallbackPool::new(&[]);
        assert_eq!(pool.entries().len(), DEFAULT_FALLBACK_REPLIES.len());
    }

    #[test]
    fn test_offline_reply_has_marker() {
        let pool = FallbackPool::default();
        let rng = Mutex::new(seeded(7));
        let reply = pool.offline_reply(&rng);
        assert!(reply.ends_with(OFFLINE_MARKER));
        assert!(reply.len() > OFFLINE_MARKER.len());
    }

    #[test]
    fn test_seeded_pick_is_reproducible() {
        let pool = FallbackPool::default();
        let a = Mutex::new(seeded(99));
        let b = Mutex::new(seeded(99));
        for _ in 0..10 {
            assert_eq!(pool.pick(&a), pool.pick(&b));
        }
    }

    #[test]
    fn test_pick_covers_pool() {
        static TWO: &[&str] = &["uno", "dos"];
        let pool = FallbackPool::new(TWO);
        let rng = Mutex::new(seeded(1));
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            seen.insert(pool.pick(&rng));
        }
        assert_eq!(seen.len(), 2);
    }
}
