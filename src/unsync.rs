//! Unsynchronized plain old data vector for fast access from multiple threads
//!
//! Every element lives in its own relaxed atomic, so workers can read and
//! write neighbouring entries concurrently without locks. Results then
//! depend on the order in which workers happen to touch shared entries, but
//! each individual load or store is always a whole value.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

/// An atomic cell holding one packed element.
pub trait Word: Send + Sync {
    type Bits: Copy;

    fn new(bits: Self::Bits) -> Self;
    fn load(&self) -> Self::Bits;
    fn store(&self, bits: Self::Bits);
}

macro_rules! relaxed_word {
    ($atomic:ty, $bits:ty) => {
        impl Word for $atomic {
            type Bits = $bits;

            #[inline]
            fn new(bits: $bits) -> Self {
                <$atomic>::new(bits)
            }

            #[inline]
            fn load(&self) -> $bits {
                <$atomic>::load(self, Ordering::Relaxed)
            }

            #[inline]
            fn store(&self, bits: $bits) {
                <$atomic>::store(self, bits, Ordering::Relaxed);
            }
        }
    };
}

relaxed_word!(AtomicU8, u8);
relaxed_word!(AtomicU32, u32);
relaxed_word!(AtomicU64, u64);

/// Plain values that fit in the smallest atomic word that can hold them.
pub trait Packed: Copy {
    type Word: Word;

    fn pack(self) -> <Self::Word as Word>::Bits;
    fn unpack(bits: <Self::Word as Word>::Bits) -> Self;
}

impl Packed for u8 {
    type Word = AtomicU8;

    #[inline]
    fn pack(self) -> u8 {
        self
    }

    #[inline]
    fn unpack(bits: u8) -> Self {
        bits
    }
}

impl Packed for [u8; 3] {
    type Word = AtomicU32;

    #[inline]
    fn pack(self) -> u32 {
        u32::from(self[0]) | u32::from(self[1]) << 8 | u32::from(self[2]) << 16
    }

    #[inline]
    fn unpack(bits: u32) -> Self {
        [bits as u8, (bits >> 8) as u8, (bits >> 16) as u8]
    }
}

pub struct UnsyncVec<T: Packed> {
    words: Vec<T::Word>,
}

impl<T: Packed> UnsyncVec<T> {
    pub fn new(v: Vec<T>) -> Self {
        Self {
            words: v.into_iter().map(|t| T::Word::new(t.pack())).collect(),
        }
    }

    pub fn filled(value: T, len: usize) -> Self {
        let bits = value.pack();
        Self {
            words: (0..len).map(|_| T::Word::new(bits)).collect(),
        }
    }

    #[inline]
    pub fn get(&self, idx: usize) -> T {
        T::unpack(self.words[idx].load())
    }

    #[inline]
    pub fn assign_at(&self, idx: usize, value: T) {
        self.words[idx].store(value.pack());
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

impl<T: Packed> Clone for UnsyncVec<T> {
    fn clone(&self) -> Self {
        Self::new(self.to_vec())
    }
}
