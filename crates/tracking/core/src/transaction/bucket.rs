use core::ops::Range;

use crate::world::{BlockChange, BlockSnapshot, BlockState, Transaction};

/// Semantic change bucket, in event priority order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ChangeBucket {
    Break,
    Modify,
    Place,
    Decay,
}

impl ChangeBucket {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [Self::Break, Self::Modify, Self::Place, Self::Decay];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Pure classification of one change.
    ///
    /// A decay intent always wins. Otherwise a solid block turning into air
    /// is a break, air turning into a solid block is a place, and everything
    /// else (including no-op changes) is a modification.
    pub fn classify(original: &BlockSnapshot, final_state: BlockState) -> Self {
        if original.change == BlockChange::Decay {
            return Self::Decay;
        }
        match (original.state.is_air(), final_state.is_air()) {
            (false, true) => Self::Break,
            (true, false) => Self::Place,
            _ => Self::Modify,
        }
    }
}

/// Transactions of one drain pass, stored contiguously in bucket order.
///
/// Each bucket occupies a contiguous range, so per-bucket events and the
/// aggregate event borrow the same transactions.
#[derive(Clone, Debug)]
pub struct BucketedTransactions {
    transactions: Vec<Transaction>,
    ranges: [Range<usize>; ChangeBucket::COUNT],
}

impl BucketedTransactions {
    /// Groups `transactions` by bucket, keeping submission order within each
    /// bucket.
    pub fn group(transactions: impl IntoIterator<Item = (ChangeBucket, Transaction)>) -> Self {
        let mut builders: [Vec<Transaction>; ChangeBucket::COUNT] = Default::default();
        for (bucket, transaction) in transactions {
            builders[bucket.index()].push(transaction);
        }

        let mut ordered = Vec::with_capacity(builders.iter().map(Vec::len).sum());
        let mut ranges: [Range<usize>; ChangeBucket::COUNT] = Default::default();
        for (bucket, builder) in builders.into_iter().enumerate() {
            let start = ordered.len();
            ordered.extend(builder);
            ranges[bucket] = start..ordered.len();
        }

        Self {
            transactions: ordered,
            ranges,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn range(&self, bucket: ChangeBucket) -> Range<usize> {
        self.ranges[bucket.index()].clone()
    }

    /// Non-empty buckets with their ranges, in priority order.
    pub fn buckets(&self) -> impl Iterator<Item = (ChangeBucket, Range<usize>)> + '_ {
        ChangeBucket::ALL
            .into_iter()
            .map(|bucket| (bucket, self.range(bucket)))
            .filter(|(_, range)| !range.is_empty())
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut [Transaction] {
        &mut self.transactions
    }
}
