//! Frequent co-expression pattern mining over per-cell transactions.

use std::collections::HashMap;

/// One transaction: the set of candidate genes expressed at a single
/// (cell ordinal, cell type) atom.
pub type Transaction = Vec<String>;

/// A frequent itemset together with its absolute support, i.e. the number
/// of transactions containing every item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Items of the set, sorted by name.
    pub items: Vec<String>,
    /// Number of transactions containing the whole set.
    pub support: usize,
}

/// Collaborator contract for frequent-itemset mining.
///
/// Implementations receive a multiset of transactions and a minimum
/// absolute support, and return every itemset whose support reaches the
/// threshold. The index owns transaction construction and scoring; the
/// miner owns candidate enumeration. The output order is unspecified.
pub trait FrequentPatternMiner {
    /// Mines all itemsets with support at least `min_support`.
    fn mine(&self, transactions: &[Transaction], min_support: usize) -> Vec<Pattern>;
}

/// FP-growth miner over a compact prefix tree.
///
/// Transactions are recoded to integer items ordered by decreasing global
/// frequency so that frequent prefixes share tree paths; mining then
/// recurses over conditional pattern bases per item.
///
/// # Examples
///
/// ```
/// use cellfind::mining::{FpGrowth, FrequentPatternMiner};
///
/// let transactions = vec![
///     vec!["CD3D".to_string(), "CD8A".to_string()],
///     vec!["CD3D".to_string()],
///     vec!["CD3D".to_string(), "CD8A".to_string()],
/// ];
/// let patterns = FpGrowth.mine(&transactions, 2);
///
/// assert!(patterns
///     .iter()
///     .any(|p| p.items == ["CD3D", "CD8A"] && p.support == 2));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FpGrowth;

impl FrequentPatternMiner for FpGrowth {
    fn mine(&self, transactions: &[Transaction], min_support: usize) -> Vec<Pattern> {
        let min_support = min_support.max(1);

        // Global item frequencies over the raw transactions.
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tx in transactions {
            let mut seen: Vec<&str> = tx.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for item in seen {
                *counts.entry(item).or_insert(0) += 1;
            }
        }

        // Keep frequent items only, ordered by decreasing frequency with
        // the name as tie-breaker, and recode them to dense ids.
        let mut frequent: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|&(_, count)| count >= min_support)
            .collect();
        frequent.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let names: Vec<&str> = frequent.iter().map(|&(name, _)| name).collect();
        let ids: HashMap<&str, u32> = names
            .iter()
            .enumerate()
            .map(|(i, &name)| (name, i as u32))
            .collect();

        // Project every transaction onto its frequent items, in id order.
        let mut projected = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let mut items: Vec<u32> = tx
                .iter()
                .filter_map(|item| ids.get(item.as_str()).copied())
                .collect();
            items.sort_unstable();
            items.dedup();
            if !items.is_empty() {
                projected.push((items, 1));
            }
        }

        let mut found = Vec::new();
        grow(&Tree::build(&projected), &[], min_support, &mut found);

        found
            .into_iter()
            .map(|(itemset, support)| {
                let mut items: Vec<String> = itemset
                    .into_iter()
                    .map(|id| names[id as usize].to_string())
                    .collect();
                items.sort_unstable();
                Pattern { items, support }
            })
            .collect()
    }
}

struct Node {
    item: u32,
    count: usize,
    parent: usize,
}

/// Prefix tree with a per-item header of node positions. Node 0 is the
/// root; its `item` and `parent` fields are never read.
struct Tree {
    nodes: Vec<Node>,
    header: Vec<(u32, Vec<usize>)>,
}

impl Tree {
    fn build(transactions: &[(Vec<u32>, usize)]) -> Self {
        let mut nodes = vec![Node {
            item: u32::MAX,
            count: 0,
            parent: 0,
        }];
        let mut header: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut children: HashMap<(usize, u32), usize> = HashMap::new();

        for (items, count) in transactions {
            let mut cur = 0;
            for &item in items {
                match children.get(&(cur, item)) {
                    Some(&child) => {
                        nodes[child].count += count;
                        cur = child;
                    }
                    None => {
                        let child = nodes.len();
                        nodes.push(Node {
                            item,
                            count: *count,
                            parent: cur,
                        });
                        children.insert((cur, item), child);
                        header.entry(item).or_default().push(child);
                        cur = child;
                    }
                }
            }
        }

        let mut header: Vec<(u32, Vec<usize>)> = header.into_iter().collect();
        header.sort_unstable_by_key(|&(item, _)| item);
        Self { nodes, header }
    }
}

/// Emits every frequent extension of `suffix` found in `tree`, recursing
/// over the conditional tree of each frequent item.
fn grow(tree: &Tree, suffix: &[u32], min_support: usize, out: &mut Vec<(Vec<u32>, usize)>) {
    for (item, positions) in &tree.header {
        let support: usize = positions.iter().map(|&pos| tree.nodes[pos].count).sum();
        if support < min_support {
            continue;
        }
        let mut itemset = suffix.to_vec();
        itemset.push(*item);
        out.push((itemset.clone(), support));

        // Conditional pattern base: the prefix path of every node of this
        // item, weighted by that node's count.
        let mut base = Vec::new();
        for &pos in positions {
            let mut path = Vec::new();
            let mut cur = tree.nodes[pos].parent;
            while cur != 0 {
                path.push(tree.nodes[cur].item);
                cur = tree.nodes[cur].parent;
            }
            if !path.is_empty() {
                path.reverse();
                base.push((path, tree.nodes[pos].count));
            }
        }
        if base.is_empty() {
            continue;
        }

        // Drop conditionally infrequent items; paths keep their original
        // order, so prefixes still share nodes in the conditional tree.
        let mut cond_counts: HashMap<u32, usize> = HashMap::new();
        for (path, count) in &base {
            for &it in path {
                *cond_counts.entry(it).or_insert(0) += count;
            }
        }
        let mut conditional = Vec::with_capacity(base.len());
        for (path, count) in base {
            let filtered: Vec<u32> = path
                .into_iter()
                .filter(|it| cond_counts[it] >= min_support)
                .collect();
            if !filtered.is_empty() {
                conditional.push((filtered, count));
            }
        }
        if !conditional.is_empty() {
            grow(&Tree::build(&conditional), &itemset, min_support, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn tx(items: &[&str]) -> Transaction {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn as_map(patterns: Vec<Pattern>) -> BTreeMap<Vec<String>, usize> {
        let mut map = BTreeMap::new();
        for p in patterns {
            assert!(map.insert(p.items, p.support).is_none(), "duplicate itemset");
        }
        map
    }

    /// Counts every frequent subset by exhaustive enumeration.
    fn brute_force(
        transactions: &[Transaction],
        min_support: usize,
    ) -> BTreeMap<Vec<String>, usize> {
        let mut universe: Vec<String> = transactions.iter().flatten().cloned().collect();
        universe.sort();
        universe.dedup();

        let mut out = BTreeMap::new();
        for mask in 1u32..(1 << universe.len()) {
            let subset: Vec<String> = (0..universe.len())
                .filter(|i| mask >> i & 1 == 1)
                .map(|i| universe[i].clone())
                .collect();
            let support = transactions
                .iter()
                .filter(|tx| subset.iter().all(|item| tx.contains(item)))
                .count();
            if support >= min_support {
                out.insert(subset, support);
            }
        }
        out
    }

    #[test]
    fn test_simple_patterns() {
        let txs = vec![
            tx(&["a", "b"]),
            tx(&["b"]),
            tx(&["a"]),
            tx(&["a", "b", "c"]),
        ];
        let got = as_map(FpGrowth.mine(&txs, 2));
        assert_eq!(got.get(&vec!["a".to_string()]), Some(&3));
        assert_eq!(got.get(&vec!["b".to_string()]), Some(&3));
        assert_eq!(got.get(&vec!["a".to_string(), "b".to_string()]), Some(&2));
        assert_eq!(got.get(&vec!["c".to_string()]), None);
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn test_support_one_returns_everything() {
        let txs = vec![tx(&["x", "y"]), tx(&["y", "z"])];
        let got = as_map(FpGrowth.mine(&txs, 1));
        assert_eq!(got, brute_force(&txs, 1));
    }

    #[test]
    fn test_duplicate_items_count_once() {
        let txs = vec![tx(&["a", "a", "b"]), tx(&["a", "b"])];
        let got = as_map(FpGrowth.mine(&txs, 2));
        assert_eq!(got.get(&vec!["a".to_string()]), Some(&2));
        assert_eq!(got.get(&vec!["a".to_string(), "b".to_string()]), Some(&2));
    }

    #[test]
    fn test_empty_input() {
        assert!(FpGrowth.mine(&[], 1).is_empty());
        assert!(FpGrowth.mine(&[tx(&["a"])], 2).is_empty());
    }

    #[test]
    fn test_matches_brute_force_on_random_inputs() {
        let mut rng = ChaChaRng::seed_from_u64(99);
        let universe = ["a", "b", "c", "d", "e", "f"];
        for _ in 0..50 {
            let num_txs = rng.gen_range(1..30);
            let txs: Vec<Transaction> = (0..num_txs)
                .map(|_| {
                    let len = rng.gen_range(1..=universe.len());
                    (0..len)
                        .map(|_| universe[rng.gen_range(0..universe.len())].to_string())
                        .collect()
                })
                .collect();
            let min_support = rng.gen_range(1..=4);
            assert_eq!(
                as_map(FpGrowth.mine(&txs, min_support)),
                brute_force(&txs, min_support),
            );
        }
    }
}
