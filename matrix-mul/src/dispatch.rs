//! Round-robin choice of the worker for each master/worker item.

use matrix_mul_types::Rank;

use crate::Error;

/// Cycles through every rank except the coordinator.
///
/// Ranks are visited in ascending cyclic order starting just after the
/// coordinator, so with coordinator 0 the sequence is `1, 2, ..., size-1, 1, ...`.
/// The order depends only on the group size and the coordinator rank.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    size: usize,
    coordinator: Rank,
    cursor: Rank,
}

impl RoundRobin {
    /// Fails unless the group has at least one worker besides `coordinator`.
    pub fn new(size: usize, coordinator: Rank) -> Result<Self, Error> {
        if size < 2 || coordinator >= size {
            return Err(Error::Configuration(format!(
                "round-robin over {size} ranks needs a coordinator below {size} and at least one worker"
            )));
        }
        Ok(Self {
            size,
            coordinator,
            cursor: coordinator,
        })
    }

    /// Every rank that can receive work, in the order they are first picked.
    pub fn workers(&self) -> impl Iterator<Item = Rank> + '_ {
        (1..self.size).map(move |step| (self.coordinator + step) % self.size)
    }

    pub fn worker_count(&self) -> usize {
        self.size - 1
    }

    pub fn next_worker(&mut self) -> Rank {
        self.cursor = (self.cursor + 1) % self.size;
        if self.cursor == self.coordinator {
            self.cursor = (self.cursor + 1) % self.size;
        }
        self.cursor
    }
}

impl Iterator for RoundRobin {
    type Item = Rank;

    fn next(&mut self) -> Option<Rank> {
        Some(self.next_worker())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_coordinator() {
        let picks: Vec<Rank> = RoundRobin::new(4, 0).unwrap().take(7).collect();
        assert_eq!(picks, vec![1, 2, 3, 1, 2, 3, 1]);

        let picks: Vec<Rank> = RoundRobin::new(4, 2).unwrap().take(5).collect();
        assert_eq!(picks, vec![3, 0, 1, 3, 0]);
    }

    #[test]
    fn workers_matches_first_cycle() {
        let rr = RoundRobin::new(5, 3).unwrap();
        let first: Vec<Rank> = rr.clone().take(4).collect();
        assert_eq!(rr.workers().collect::<Vec<_>>(), first);
    }

    #[test]
    fn rejects_group_without_workers() {
        assert!(matches!(RoundRobin::new(1, 0), Err(Error::Configuration(_))));
        assert!(matches!(RoundRobin::new(0, 0), Err(Error::Configuration(_))));
        assert!(matches!(RoundRobin::new(3, 3), Err(Error::Configuration(_))));
    }
}
