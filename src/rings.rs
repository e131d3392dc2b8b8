use std::collections::{HashMap, VecDeque};

use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;

use crate::fragment::{AtomId, FragmentId, FragmentManager};

/// Dense, index-based view of one fragment's bonds.
struct LocalGraph {
    atoms: Vec<AtomId>,
    adj: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
    edge_index: HashMap<(usize, usize), usize>,
}

impl LocalGraph {
    fn new(fm: &FragmentManager, frag: FragmentId) -> Self {
        let atoms = fm.fragment(frag).atoms().to_vec();
        let pos: HashMap<AtomId, usize> = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        let mut adj = vec![Vec::new(); atoms.len()];
        let mut edges = Vec::new();
        let mut edge_index = HashMap::new();
        for (a, b, _) in fm.fragment_bonds(frag) {
            let (u, v) = (pos[&a], pos[&b]);
            adj[u].push(v);
            adj[v].push(u);
            edge_index.insert((u.min(v), u.max(v)), edges.len());
            edges.push((u, v));
        }
        for list in &mut adj {
            list.sort_unstable();
        }
        Self {
            atoms,
            adj,
            edges,
            edge_index,
        }
    }

    fn edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_index.get(&(a.min(b), a.max(b))).copied()
    }

    fn component_count(&self) -> usize {
        let mut g: UnGraph<(), ()> = UnGraph::with_capacity(self.atoms.len(), self.edges.len());
        let nodes: Vec<_> = (0..self.atoms.len()).map(|_| g.add_node(())).collect();
        for &(u, v) in &self.edges {
            g.add_edge(nodes[u], nodes[v], ());
        }
        connected_components(&g)
    }
}

/// Smallest set of smallest rings of one fragment.
#[derive(Debug, Clone)]
pub struct RingInfo {
    rings: Vec<Vec<AtomId>>,
}

impl RingInfo {
    pub fn sssr(fm: &FragmentManager, frag: FragmentId) -> Self {
        let graph = LocalGraph::new(fm, frag);
        let num_expected = (graph.edges.len() + graph.component_count()).saturating_sub(graph.atoms.len());
        if num_expected == 0 {
            return Self { rings: vec![] };
        }

        let candidates = horton_candidates(&graph);
        let mut basis: Vec<Vec<u64>> = Vec::with_capacity(num_expected);
        let mut rings = Vec::with_capacity(num_expected);
        for ring in &candidates {
            if rings.len() >= num_expected {
                break;
            }
            let bv = ring_to_edge_bitvector(ring, &graph);
            if bv.iter().all(|&w| w == 0) {
                continue;
            }
            if try_add_to_basis(&mut basis, bv) {
                rings.push(normalize_ring(ring));
            }
        }
        rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        Self {
            rings: rings
                .into_iter()
                .map(|r| r.into_iter().map(|i| graph.atoms[i]).collect())
                .collect(),
        }
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    /// Each ring as a cycle of atoms: consecutive entries are bonded, as are
    /// the last and the first.
    pub fn rings(&self) -> &[Vec<AtomId>] {
        &self.rings
    }

    /// Number of rings containing the bond `a`-`b`.
    pub fn bond_ring_count(&self, a: AtomId, b: AtomId) -> usize {
        self.rings
            .iter()
            .filter(|ring| {
                let len = ring.len();
                (0..len).any(|i| {
                    let j = (i + 1) % len;
                    (ring[i] == a && ring[j] == b) || (ring[i] == b && ring[j] == a)
                })
            })
            .count()
    }
}

/// Edges minus atoms plus components: the number of independent rings.
pub fn cyclomatic_number(fm: &FragmentManager, frag: FragmentId) -> usize {
    let graph = LocalGraph::new(fm, frag);
    (graph.edges.len() + graph.component_count()).saturating_sub(graph.atoms.len())
}

/// Sets [`Atom::in_ring`](crate::fragment::Atom) on every atom of `frag`
/// that lies on a cycle: an atom is cyclic exactly when one of its bonds is
/// not a bridge of the bond graph.
pub fn mark_ring_atoms(fm: &mut FragmentManager, frag: FragmentId) {
    let graph = LocalGraph::new(fm, frag);
    let n = graph.atoms.len();
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut cyclic = vec![false; n];
    let mut time = 0;

    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        // Iterative DFS: (node, parent edge, next neighbour position).
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
        disc[root] = time;
        low[root] = time;
        time += 1;

        while let Some(top) = stack.last_mut() {
            let (node, parent_edge, pos) = *top;
            if let Some(&nb) = graph.adj[node].get(pos) {
                top.2 += 1;
                let edge = graph.edge(node, nb);
                if edge == parent_edge {
                    continue;
                }
                if disc[nb] == usize::MAX {
                    disc[nb] = time;
                    low[nb] = time;
                    time += 1;
                    stack.push((nb, edge, 0));
                } else {
                    low[node] = low[node].min(disc[nb]);
                }
            } else {
                stack.pop();
                if let Some(&(parent, _, _)) = stack.last() {
                    low[parent] = low[parent].min(low[node]);
                    if low[node] <= disc[parent] {
                        // parent-node is not a bridge
                        cyclic[node] = true;
                        cyclic[parent] = true;
                    }
                }
            }
        }
    }

    for (i, &atom) in graph.atoms.iter().enumerate() {
        fm.atom_mut(atom).in_ring = cyclic[i];
    }
}

/// Shortest path between two atoms of `frag` that avoids `forbidden`, as a
/// list of atoms from `from` to `to` inclusive.
pub fn shortest_path(
    fm: &FragmentManager,
    frag: FragmentId,
    from: AtomId,
    to: AtomId,
    forbidden: &[AtomId],
) -> Option<Vec<AtomId>> {
    let mut prev: HashMap<AtomId, AtomId> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    let mut seen = vec![from];
    while let Some(cur) = queue.pop_front() {
        if cur == to {
            let mut path = vec![to];
            let mut node = to;
            while let Some(&p) = prev.get(&node) {
                path.push(p);
                node = p;
            }
            path.reverse();
            return Some(path);
        }
        let mut nbs: Vec<AtomId> = fm
            .neighbors(cur)
            .filter(|&n| fm.fragment_of(n) == frag && !forbidden.contains(&n) && !seen.contains(&n))
            .collect();
        nbs.sort();
        for nb in nbs {
            seen.push(nb);
            prev.insert(nb, cur);
            queue.push_back(nb);
        }
    }
    None
}

fn horton_candidates(graph: &LocalGraph) -> Vec<Vec<usize>> {
    let n = graph.atoms.len();
    let (dist, pred) = all_pairs_bfs(graph);

    let mut candidates: Vec<Vec<usize>> = Vec::new();
    for &(u, v) in &graph.edges {
        for w in 0..n {
            let du = dist[w][u];
            let dv = dist[w][v];
            if du == u32::MAX || dv == u32::MAX {
                continue;
            }
            if du as usize + dv as usize + 1 < 3 {
                continue;
            }
            let path_u = reconstruct_path(&pred, w, u);
            let path_v = reconstruct_path(&pred, w, v);
            if paths_share_internal_node(&path_u, &path_v) {
                continue;
            }
            let mut ring = path_u;
            ring.extend(path_v[1..].iter().rev());
            candidates.push(ring);
        }
    }

    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

fn all_pairs_bfs(graph: &LocalGraph) -> (Vec<Vec<u32>>, Vec<Vec<Option<usize>>>) {
    let n = graph.atoms.len();
    let mut dist = vec![vec![u32::MAX; n]; n];
    let mut pred = vec![vec![None; n]; n];
    for src in 0..n {
        dist[src][src] = 0;
        let mut queue = VecDeque::from([src]);
        while let Some(cur) = queue.pop_front() {
            let d = dist[src][cur];
            for &nb in &graph.adj[cur] {
                if dist[src][nb] == u32::MAX {
                    dist[src][nb] = d + 1;
                    pred[src][nb] = Some(cur);
                    queue.push_back(nb);
                }
            }
        }
    }
    (dist, pred)
}

fn reconstruct_path(pred: &[Vec<Option<usize>>], src: usize, dst: usize) -> Vec<usize> {
    let mut path = vec![dst];
    let mut cur = dst;
    while cur != src {
        match pred[src][cur] {
            Some(p) => {
                path.push(p);
                cur = p;
            }
            None => return vec![],
        }
    }
    path.reverse();
    path
}

fn paths_share_internal_node(path_u: &[usize], path_v: &[usize]) -> bool {
    if path_u.len() < 2 || path_v.len() < 2 {
        return false;
    }
    path_u[1..].iter().any(|node| path_v[1..].contains(node))
}

fn ring_to_edge_bitvector(ring: &[usize], graph: &LocalGraph) -> Vec<u64> {
    let mut bv = vec![0u64; graph.edges.len().div_ceil(64)];
    let len = ring.len();
    for i in 0..len {
        if let Some(idx) = graph.edge(ring[i], ring[(i + 1) % len]) {
            bv[idx / 64] |= 1u64 << (idx % 64);
        }
    }
    bv
}

fn try_add_to_basis(basis: &mut Vec<Vec<u64>>, candidate: Vec<u64>) -> bool {
    let mut v = candidate;
    for row in basis.iter() {
        if let Some(p) = leading_bit(row) {
            if v[p / 64] & (1u64 << (p % 64)) != 0 {
                xor_into(&mut v, row);
            }
        }
    }
    if v.iter().all(|&w| w == 0) {
        return false;
    }
    basis.push(v);
    true
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    bv.iter()
        .enumerate()
        .find(|(_, &word)| word != 0)
        .map(|(i, &word)| i * 64 + word.trailing_zeros() as usize)
}

fn xor_into(a: &mut [u64], b: &[u64]) {
    for (aw, bw) in a.iter_mut().zip(b.iter()) {
        *aw ^= *bw;
    }
}

fn normalize_ring(ring: &[usize]) -> Vec<usize> {
    let Some(min_pos) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, idx)| idx)
        .map(|(i, _)| i)
    else {
        return vec![];
    };

    let len = ring.len();
    let mut normalized: Vec<usize> = (0..len).map(|i| ring[(min_pos + i) % len]).collect();
    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }
    normalized
}
