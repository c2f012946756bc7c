//! Bounded Sliding Windows

use crate::{SensorReading, WindowError};
use std::collections::{HashMap, VecDeque};

/// Bounded FIFO of the most recent readings of one machine
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    /// Readings, oldest at the front
    storage: VecDeque<SensorReading>,
    /// Capacity of the window
    capacity: usize,
}

impl SlidingWindow {
    /// Create a new window with given capacity
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            storage: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Push a reading (evicts and returns the oldest if full)
    pub fn push(&mut self, reading: SensorReading) -> Option<SensorReading> {
        let evicted = if self.storage.len() == self.capacity {
            self.storage.pop_front()
        } else {
            None
        };
        self.storage.push_back(reading);
        evicted
    }

    /// Number of readings currently held
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Whether the window holds `capacity` readings
    pub fn is_full(&self) -> bool {
        self.storage.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent reading
    pub fn latest(&self) -> Option<&SensorReading> {
        self.storage.back()
    }

    /// Reading `steps` positions before the most recent one (0 = most recent)
    pub fn back(&self, steps: usize) -> Option<&SensorReading> {
        let len = self.storage.len();
        if steps >= len {
            return None;
        }
        self.storage.get(len - 1 - steps)
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SensorReading> + '_ {
        self.storage.iter()
    }
}

/// One sliding window per machine id
#[derive(Debug, Clone)]
pub struct WindowRegistry {
    windows: HashMap<String, SlidingWindow>,
    capacity: usize,
}

impl WindowRegistry {
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            windows: HashMap::new(),
            capacity,
        })
    }

    /// Push a reading into its machine's window, enforcing timestamp order
    pub fn push(&mut self, reading: SensorReading) -> Result<&SlidingWindow, WindowError> {
        let capacity = self.capacity;
        let window = match self.windows.entry(reading.machine_id.clone()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(SlidingWindow::new(capacity)?)
            }
        };

        if let Some(last) = window.latest() {
            if reading.timestamp < last.timestamp {
                return Err(WindowError::OutOfOrder {
                    machine_id: reading.machine_id,
                    timestamp: reading.timestamp,
                    last: last.timestamp,
                });
            }
        }

        window.push(reading);
        Ok(window)
    }

    /// Window of a machine, if any reading was seen
    pub fn get(&self, machine_id: &str) -> Option<&SlidingWindow> {
        self.windows.get(machine_id)
    }

    /// Number of machines tracked
    pub fn machine_count(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::reading;

    #[test]
    fn test_push_and_read() {
        let mut window = SlidingWindow::new(10).unwrap();

        for i in 0..5 {
            window.push(reading("MAQ_01", i, i as f64 * 100.0));
        }

        assert_eq!(window.len(), 5);

        let readings: Vec<&SensorReading> = window.iter().rev().take(3).collect();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].vibration, 400.0); // Most recent
        assert_eq!(readings[2].vibration, 200.0);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut window = SlidingWindow::new(5).unwrap();

        for i in 0..10 {
            let evicted = window.push(reading("MAQ_01", i, i as f64));
            if i < 5 {
                assert!(evicted.is_none());
            } else {
                assert_eq!(evicted.unwrap().vibration, (i - 5) as f64);
            }
        }

        assert!(window.is_full());
        assert_eq!(window.len(), 5);
        assert_eq!(window.iter().next().unwrap().vibration, 5.0);
    }

    #[test]
    fn test_back_steps() {
        let mut window = SlidingWindow::new(6).unwrap();
        for i in 0..6 {
            window.push(reading("MAQ_01", i, i as f64));
        }
        assert_eq!(window.back(0).unwrap().vibration, 5.0);
        assert_eq!(window.back(5).unwrap().vibration, 0.0);
        assert!(window.back(6).is_none());
    }

    #[test]
    fn test_iter_runs_both_ways() {
        let mut window = SlidingWindow::new(4).unwrap();
        for i in 0..6 {
            window.push(reading("MAQ_01", i, i as f64));
        }
        let forward: Vec<f64> = window.iter().map(|r| r.vibration).collect();
        assert_eq!(forward, vec![2.0, 3.0, 4.0, 5.0]);

        // Trailing readings, newest first
        let trailing: Vec<f64> = window.iter().rev().take(3).map(|r| r.vibration).collect();
        assert_eq!(trailing, vec![5.0, 4.0, 3.0]);
        assert_eq!(window.back(2).unwrap().vibration, trailing[2]);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(SlidingWindow::new(0).unwrap_err(), WindowError::ZeroCapacity);
        assert!(WindowRegistry::new(0).is_err());
    }

    #[test]
    fn test_registry_keeps_machines_apart() {
        let mut registry = WindowRegistry::new(3).unwrap();
        for i in 0..4 {
            registry.push(reading("MAQ_01", i, 1.0)).unwrap();
        }
        registry.push(reading("MAQ_02", 0, 2.0)).unwrap();

        assert_eq!(registry.machine_count(), 2);
        assert_eq!(registry.get("MAQ_01").unwrap().len(), 3);
        assert_eq!(registry.get("MAQ_02").unwrap().len(), 1);
    }

    #[test]
    fn test_registry_rejects_out_of_order() {
        let mut registry = WindowRegistry::new(3).unwrap();
        registry.push(reading("MAQ_01", 5, 1.0)).unwrap();
        let err = registry.push(reading("MAQ_01", 4, 1.0)).unwrap_err();
        assert!(matches!(err, WindowError::OutOfOrder { .. }));
        // Equal timestamps are accepted
        assert!(registry.push(reading("MAQ_01", 5, 1.0)).is_ok());
    }
}
