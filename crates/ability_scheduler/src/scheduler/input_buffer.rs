//! Input buffer — time-windowed priority arbitration
//!
//! Алгоритм resolve (один раз за тик):
//! 1. Выкидываем entries старше `window`
//! 2. Пусто → выходим
//! 3. Winner = max priority, tie → самый ранний (stable)
//! 4. Буфер очищается ЦЕЛИКОМ, независимо от того запустился winner или нет
//!
//! Проигравшие presses не переносятся на следующий тик.

use crate::ability::AbilityId;

/// Buffered activation request
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedInput {
    pub time: f64,
    pub ability: AbilityId,
    pub priority: i32,
}

#[derive(Debug, Default)]
pub struct InputBuffer {
    entries: Vec<QueuedInput>,
}

impl InputBuffer {
    pub fn push(&mut self, ability: AbilityId, priority: i32, time: f64) {
        self.entries.push(QueuedInput {
            time,
            ability,
            priority,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueuedInput] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Выбирает winner и очищает буфер
    pub fn resolve(&mut self, now: f64, window: f32) -> Option<QueuedInput> {
        if self.entries.is_empty() {
            return None;
        }

        let window = f64::from(window);
        let mut winner: Option<QueuedInput> = None;
        for entry in self.entries.drain(..) {
            if now - entry.time > window {
                continue;
            }
            // strict `>` сохраняет самый ранний при равных priority
            if winner.as_ref().map_or(true, |best| entry.priority > best.priority) {
                winner = Some(entry);
            }
        }

        winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_highest_priority_wins() {
        let mut buffer = InputBuffer::default();
        buffer.push("grapple".into(), 1, 0.0);
        buffer.push("dash".into(), 10, 0.0);

        let winner = buffer.resolve(0.016, 0.08).unwrap();
        assert_eq!(winner.ability, AbilityId::from("dash"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_tie_prefers_earliest_insertion() {
        let mut buffer = InputBuffer::default();
        buffer.push("first".into(), 5, 0.0);
        buffer.push("second".into(), 5, 0.01);

        let winner = buffer.resolve(0.02, 0.08).unwrap();
        assert_eq!(winner.ability, AbilityId::from("first"));
    }

    #[test]
    fn test_stale_entry_never_selected() {
        let mut buffer = InputBuffer::default();
        buffer.push("ultimate".into(), 100, 0.0);
        buffer.push("dash".into(), 0, 0.95);

        let winner = buffer.resolve(1.0, 0.08).unwrap();
        assert_eq!(winner.ability, AbilityId::from("dash"));
    }

    #[test]
    fn test_all_stale_clears_buffer() {
        let mut buffer = InputBuffer::default();
        buffer.push("dash".into(), 0, 0.0);

        assert!(buffer.resolve(1.0, 0.08).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_entry_exactly_at_window_edge_survives() {
        let mut buffer = InputBuffer::default();
        buffer.push("dash".into(), 0, 0.5);
        assert!(buffer.resolve(1.0, 0.5).is_some());
    }

    proptest! {
        #[test]
        fn prop_resolve_picks_max_fresh_priority(
            entries in prop::collection::vec((0u8..20, -50i32..50, 0.0f64..1.0), 1..24),
        ) {
            let now = 1.0;
            let window = 0.5f32;
            let mut buffer = InputBuffer::default();
            for (index, priority, time) in &entries {
                buffer.push(AbilityId(format!("ability_{index}")), *priority, *time);
            }

            let fresh: Vec<_> = entries
                .iter()
                .filter(|(_, _, time)| now - *time <= f64::from(window))
                .collect();
            let winner = buffer.resolve(now, window);

            prop_assert!(buffer.is_empty());
            match fresh.iter().map(|(_, priority, _)| *priority).max() {
                None => prop_assert!(winner.is_none()),
                Some(best) => {
                    let winner = winner.unwrap();
                    prop_assert_eq!(winner.priority, best);
                    prop_assert!(now - winner.time <= f64::from(window));
                    // первый fresh entry с максимальным priority
                    let first = fresh.iter().find(|(_, priority, _)| *priority == best).unwrap();
                    prop_assert_eq!(winner.ability, AbilityId(format!("ability_{}", first.0)));
                    prop_assert_eq!(winner.time, first.2);
                }
            }
        }
    }
}
