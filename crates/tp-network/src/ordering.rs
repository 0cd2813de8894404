//! Longitudinal ordering of the main-line blocks.
//!
//! Blocks are sorted by coordinate. A substation splits the line into two
//! zones, so blocks sharing its coordinate must be told which zone they
//! belong to:
//! - a branch fed from the left shoulder sorts before the substation, one
//!   fed from the right shoulder after it;
//! - anything at the last substation's coordinate sorts before it, anything
//!   else at a substation's coordinate after it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tp_blocks::{Block, Side, TopologyBlock};
use tp_core::{Phasor, Real};

use crate::error::{NetworkError, NetworkResult};

/// Position of a block relative to a substation at the same coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tie {
    Before,
    Axis,
    After,
}

/// Tie rank of a block; `last_substation` is the coordinate of the last
/// substation on the line.
pub fn tie<T: Phasor>(block: &Block<T>, last_substation: Real) -> Tie {
    if block.is_substation() {
        return Tie::Axis;
    }
    if let Some(side) = block.as_branch().and_then(|b| b.feed_side()) {
        return match side {
            Side::Left => Tie::Before,
            Side::Right => Tie::After,
        };
    }
    if block.coordinate() == last_substation {
        Tie::Before
    } else {
        Tie::After
    }
}

/// Total order on `(coordinate, tie)` keys.
pub fn compare(a: (Real, Tie), b: (Real, Tie)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Validate the block list and sort it in place.
///
/// Resolves every branch's feeding side first, since the side decides the
/// tie rank. The sort is stable, so blocks with equal keys keep the order
/// they were given in.
pub fn order<T: Phasor>(blocks: &mut [Block<T>]) -> NetworkResult<()> {
    check_labels(blocks)?;

    let substations: BTreeMap<String, Real> = blocks
        .iter()
        .filter(|b| b.is_substation())
        .map(|b| (b.label().to_string(), b.coordinate()))
        .collect();
    if substations.len() < 2 {
        return Err(NetworkError::Ordering {
            what: format!("a line needs at least two substations, found {}", substations.len()),
        });
    }

    let mut attached = BTreeSet::new();
    for block in blocks.iter_mut() {
        if !block.coordinate().is_finite() {
            return Err(NetworkError::Ordering {
                what: format!("'{}' has a non-finite coordinate", block.label()),
            });
        }
        let Some(branch) = block.as_branch_mut() else {
            continue;
        };
        if !attached.insert(branch.index()) {
            return Err(NetworkError::Ordering {
                what: format!("branch {} attaches to the main line twice", branch.index()),
            });
        }
        if let Some(feeder) = branch.feeding_substation() {
            let coordinate =
                *substations
                    .get(feeder)
                    .ok_or_else(|| NetworkError::UnknownLabel {
                        label: feeder.to_string(),
                    })?;
            branch.resolve_side(coordinate)?;
        }
    }

    let last = substations
        .values()
        .copied()
        .fold(Real::NEG_INFINITY, Real::max);
    blocks.sort_by(|a, b| compare((a.coordinate(), tie(a, last)), (b.coordinate(), tie(b, last))));

    let ends = [blocks.first(), blocks.last()];
    if let Some(end) = ends.into_iter().flatten().find(|b| !b.is_substation()) {
        return Err(NetworkError::Ordering {
            what: format!("'{}' lies outside the substations at the line ends", end.label()),
        });
    }
    Ok(())
}

/// Indices of the substations in an ordered list: the zone boundaries.
pub fn boundaries<T: Phasor>(blocks: &[Block<T>]) -> Vec<usize> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_substation())
        .map(|(i, _)| i)
        .collect()
}

fn check_labels<T: Phasor>(blocks: &[Block<T>]) -> NetworkResult<()> {
    fn visit<T: Phasor>(block: &Block<T>, seen: &mut BTreeSet<String>) -> NetworkResult<()> {
        if !seen.insert(block.label().to_string()) {
            return Err(NetworkError::DuplicateLabel {
                label: block.label().to_string(),
            });
        }
        if let Some(branch) = block.as_branch() {
            seen.insert(branch.splitter().label().to_string());
            for inner in branch.blocks() {
                visit(inner, seen)?;
            }
        }
        Ok(())
    }
    let mut seen = BTreeSet::new();
    for block in blocks {
        visit(block, &mut seen)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tp_blocks::{BlockParams, BlockSpec, BuildContext, LoadParams, SubstationParams};
    use tp_core::TrackId;

    fn ss(x: Real) -> BlockSpec<f64> {
        BlockSpec::new(BlockParams::Substation(SubstationParams::simple(
            x,
            vec![1],
            3300.0,
            0.05,
        )))
    }

    fn load(x: Real) -> BlockSpec<f64> {
        BlockSpec::new(BlockParams::Load(LoadParams::new(x, TrackId::main(1), 100.0)))
    }

    fn build(specs: Vec<BlockSpec<f64>>) -> Vec<Block<f64>> {
        let mut ctx = BuildContext::default();
        specs
            .into_iter()
            .map(|s| Block::from_spec(s, &mut ctx).unwrap())
            .collect()
    }

    fn labels(blocks: &[Block<f64>]) -> Vec<&str> {
        blocks.iter().map(|b| b.label()).collect()
    }

    #[test]
    fn loads_on_end_substations_stay_inside() {
        let mut blocks = build(vec![load(20.0), ss(20.0), load(0.0), ss(0.0)]);
        order(&mut blocks).unwrap();
        assert_eq!(labels(&blocks), ["SS2", "L2", "L1", "SS1"]);
    }

    #[test]
    fn loads_on_inner_substations_join_the_right_zone() {
        let mut blocks = build(vec![ss(0.0), load(10.0), ss(10.0), ss(20.0)]);
        order(&mut blocks).unwrap();
        assert_eq!(labels(&blocks), ["SS1", "SS2", "L1", "SS3"]);
        assert_eq!(boundaries(&blocks), vec![0, 1, 3]);
    }

    #[test]
    fn one_substation_is_not_a_line() {
        let mut blocks = build(vec![ss(0.0), load(5.0)]);
        assert!(matches!(order(&mut blocks), Err(NetworkError::Ordering { .. })));
    }

    #[test]
    fn blocks_beyond_the_ends_rejected() {
        let mut blocks = build(vec![ss(0.0), ss(10.0), load(12.0)]);
        assert!(matches!(order(&mut blocks), Err(NetworkError::Ordering { .. })));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let mut ctx = BuildContext::default();
        let mut blocks: Vec<Block<f64>> = [ss(0.0), ss(10.0)]
            .into_iter()
            .map(|mut s| {
                s.label = Some("SS".into());
                Block::from_spec(s, &mut ctx).unwrap()
            })
            .collect();
        assert!(matches!(
            order(&mut blocks),
            Err(NetworkError::DuplicateLabel { .. })
        ));
    }

    proptest! {
        #[test]
        fn order_is_sorted_and_ties_are_ranked(
            inner_subs in proptest::collection::vec(1u8..4, 0..3),
            loads in proptest::collection::vec(0u8..5, 0..8),
        ) {
            let mut specs = vec![ss(20.0), ss(0.0)];
            specs.extend(inner_subs.iter().map(|k| ss(*k as Real * 5.0)));
            specs.extend(loads.iter().map(|k| load(*k as Real * 5.0)));
            let mut blocks = build(specs);
            order(&mut blocks).unwrap();

            prop_assert!(blocks.first().unwrap().is_substation());
            prop_assert!(blocks.last().unwrap().is_substation());
            for pair in blocks.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(a.coordinate() <= b.coordinate());
                if a.coordinate() == b.coordinate() {
                    prop_assert!(tie(a, 20.0) <= tie(b, 20.0));
                }
            }
            // loads on the end substations stay between them
            prop_assert_eq!(blocks.first().unwrap().label(), "SS2");
            prop_assert_eq!(blocks.last().unwrap().label(), "SS1");
        }
    }
}
