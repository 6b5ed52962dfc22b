const SIZE: usize = 55;

/// ## Random numbers
///
/// An additive lagged Fibonacci generator over 55 words. Seeding fills
/// the table from a linear congruential sequence, refilling until it
/// holds at least five odd and five even entries so the low bit of the
/// output cycles properly.

#[derive(Debug, Clone)]
pub struct Random {
    table: [i32; SIZE],
    n1: usize,
    n2: usize,
}

impl Default for Random {
    fn default() -> Random {
        Random::new(1)
    }
}

impl Random {
    pub fn new(seed: i32) -> Random {
        let mut random = Random {
            table: [0; SIZE],
            n1: 31,
            n2: 0,
        };
        random.seed(seed);
        random
    }

    pub fn seed(&mut self, seed: i32) {
        let mut lcg = seed;
        loop {
            let mut odd = 0;
            for entry in self.table.iter_mut() {
                lcg = lcg.wrapping_mul(8_323_199).wrapping_add(1);
                *entry = lcg;
                if lcg & 1 != 0 {
                    odd += 1;
                }
            }
            if odd >= 5 && SIZE - odd >= 5 {
                break;
            }
        }
        self.n1 = 31;
        self.n2 = 0;
    }

    /// Reseed from the thread's entropy source.
    pub fn seed_from_entropy(&mut self) {
        self.seed(rand::random::<i32>());
    }

    pub fn next(&mut self) -> u32 {
        let x = self.table[self.n1].wrapping_add(self.table[self.n2]);
        self.table[self.n2] = x;
        self.n1 = (self.n1 + 1) % SIZE;
        self.n2 = (self.n2 + 1) % SIZE;
        x.wrapping_abs() as u32
    }

    /// A number from 1 to `range` inclusive.
    pub fn below(&mut self, range: u16) -> u16 {
        debug_assert!(range > 0);
        (self.next() % range as u32) as u16 + 1
    }
}
