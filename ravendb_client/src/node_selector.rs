use rand::Rng;

use crate::{
    document_conventions::ReadBalanceBehavior, server_node::ServerNode, topology::Topology,
};

/// Chooses which node of the topology a request goes to.
///
/// The selector keeps:
/// * the current topology
/// * the index of the currently preferred node
/// * failure counts per node, reset when a node recovers or the topology is replaced
/// * the result of the last speed test, when reads are balanced by speed
///
/// It performs no I/O. The request executor owns one behind a mutex and feeds it the outcome of
/// every request.
#[derive(Debug)]
pub struct NodeSelector {
    topology: Topology,
    current_node_index: usize,
    /// Failure count per node index. Non zero means the node is out of rotation.
    node_failures: Vec<u32>,
    read_balance_behavior: ReadBalanceBehavior,
    in_speed_test_phase: bool,
    fastest_node_index: Option<usize>,
    round_robin_cursor: usize,
}

impl NodeSelector {
    pub fn new(topology: Topology, read_balance_behavior: ReadBalanceBehavior) -> Self {
        let node_count = topology.nodes.len();
        let round_robin_cursor = if node_count > 0 {
            rand::thread_rng().gen_range(0..node_count)
        } else {
            0
        };

        Self {
            current_node_index: topology.leader_index(),
            node_failures: vec![0; node_count],
            in_speed_test_phase: read_balance_behavior == ReadBalanceBehavior::FastestNode
                && node_count > 1,
            fastest_node_index: None,
            read_balance_behavior,
            round_robin_cursor,
            topology,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn nodes(&self) -> &[ServerNode] {
        &self.topology.nodes
    }

    pub fn current_node_index(&self) -> usize {
        self.current_node_index
    }

    pub fn is_failed(&self, index: usize) -> bool {
        self.node_failures.get(index).map(|f| *f > 0).unwrap_or(false)
    }

    pub fn in_speed_test_phase(&self) -> bool {
        self.in_speed_test_phase
    }

    /// Returns the node at the current index, whether or not it is failed.
    pub fn get_current_node(&self) -> Option<(usize, ServerNode)> {
        self.node_at(self.current_node_index)
    }

    /// Returns the current node if it is healthy, otherwise the next healthy node after it.
    /// Falls back to the current node when every node is failed.
    pub fn get_preferred_node(&self) -> Option<(usize, ServerNode)> {
        let count = self.topology.nodes.len();
        (0..count)
            .map(|offset| (self.current_node_index + offset) % count)
            .find(|index| !self.is_failed(*index))
            .and_then(|index| self.node_at(index))
            .or_else(|| self.get_current_node())
    }

    /// Like [`get_preferred_node`](Self::get_preferred_node), but never returns a node `skip`
    /// rejects. Healthy nodes come first, then failed ones. `None` when `skip` rejects them all.
    pub fn get_preferred_node_skipping<F>(&self, skip: F) -> Option<(usize, ServerNode)>
    where
        F: Fn(&ServerNode) -> bool,
    {
        let count = self.topology.nodes.len();
        let candidates = (0..count)
            .map(|offset| (self.current_node_index + offset) % count)
            .filter(|index| !skip(&self.topology.nodes[*index]))
            .collect::<Vec<_>>();

        candidates
            .iter()
            .find(|index| !self.is_failed(**index))
            .or_else(|| candidates.first())
            .and_then(|index| self.node_at(*index))
    }

    /// Returns the node with the given cluster tag.
    pub fn get_requested_node(&self, cluster_tag: &str) -> Option<(usize, ServerNode)> {
        self.topology
            .nodes
            .iter()
            .position(|n| n.cluster_tag.as_deref() == Some(cluster_tag))
            .and_then(|index| self.node_at(index))
    }

    /// Returns the node pinned by the last speed test, or the healthy node with the lowest
    /// average response time when no test has finished yet.
    pub fn get_fastest_node(&self) -> Option<(usize, ServerNode)> {
        if let Some(index) = self.fastest_node_index.filter(|i| !self.is_failed(*i)) {
            return self.node_at(index);
        }

        self.topology
            .nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.is_failed(*index))
            .filter_map(|(index, node)| node.average_response_time_ms().map(|ms| (index, ms)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .and_then(|(index, _)| self.node_at(index))
            .or_else(|| self.get_preferred_node())
    }

    /// Picks the node for one request according to the read balance behavior. Writes always go
    /// to the preferred node.
    pub fn get_node_for_request(&mut self, is_read_request: bool) -> Option<(usize, ServerNode)> {
        if !is_read_request {
            return self.get_preferred_node();
        }

        match self.read_balance_behavior {
            ReadBalanceBehavior::None => self.get_preferred_node(),
            ReadBalanceBehavior::RoundRobin => self.next_round_robin_node(),
            ReadBalanceBehavior::FastestNode => {
                if self.in_speed_test_phase {
                    self.get_preferred_node()
                } else {
                    self.get_fastest_node()
                }
            }
        }
    }

    /// Marks the node at `index` failed and moves the current index to the next node that is
    /// not failed. Returns `false` when every node has failed, in which case the index simply
    /// moves on by one.
    pub fn on_failed_request(&mut self, index: usize) -> bool {
        let count = self.topology.nodes.len();
        if index >= count {
            return false;
        }

        self.node_failures[index] = self.node_failures[index].saturating_add(1);

        if self.fastest_node_index == Some(index) {
            self.fastest_node_index = None;
            self.schedule_speed_test();
        }

        let next = (1..count)
            .map(|offset| (index + offset) % count)
            .find(|candidate| self.node_failures[*candidate] == 0);

        match next {
            Some(candidate) => {
                self.current_node_index = candidate;
                true
            }
            None => {
                self.current_node_index = (index + 1) % count;
                false
            }
        }
    }

    /// Clears the failure state of a node after it answered a request.
    pub fn on_successful_request(&mut self, index: usize) {
        if let Some(failures) = self.node_failures.get_mut(index) {
            *failures = 0;
        }
    }

    /// Replaces the topology when `force` is set or the new etag is newer.
    ///
    /// The currently selected node stays selected if it is still part of the new topology,
    /// otherwise selection restarts at the first node. An empty topology is never accepted.
    pub fn on_update_topology(&mut self, topology: Topology, force: bool) -> bool {
        if topology.nodes.is_empty() {
            return false;
        }
        if !force && !self.topology.is_superseded_by(&topology) {
            return false;
        }

        let previous = self.topology.nodes.get(self.current_node_index).cloned();
        let node_count = topology.nodes.len();

        self.current_node_index = previous
            .and_then(|p| topology.nodes.iter().position(|n| *n == p))
            .unwrap_or(0);
        self.node_failures = vec![0; node_count];
        self.fastest_node_index = None;
        self.round_robin_cursor %= node_count;
        self.in_speed_test_phase =
            self.read_balance_behavior == ReadBalanceBehavior::FastestNode && node_count > 1;
        self.topology = topology;

        true
    }

    /// Puts a recovered node back into rotation. The current index only moves to it when the
    /// currently selected node is itself failed.
    pub fn restore_node_index(&mut self, index: usize) {
        if index >= self.node_failures.len() {
            return;
        }
        self.node_failures[index] = 0;

        if self.is_failed(self.current_node_index) {
            self.current_node_index = index;
        }
    }

    /// Enters the speed test phase. Only meaningful when balancing reads by speed.
    pub fn schedule_speed_test(&mut self) {
        if self.read_balance_behavior == ReadBalanceBehavior::FastestNode
            && self.topology.nodes.len() > 1
        {
            self.in_speed_test_phase = true;
        }
    }

    /// Pins the winner of a speed test and leaves the speed test phase.
    pub fn record_fastest(&mut self, index: usize) {
        if index >= self.topology.nodes.len() {
            return;
        }
        self.fastest_node_index = Some(index);
        self.in_speed_test_phase = false;
    }

    fn next_round_robin_node(&mut self) -> Option<(usize, ServerNode)> {
        let count = self.topology.nodes.len();
        if count == 0 {
            return None;
        }

        let chosen = (0..count)
            .map(|offset| (self.round_robin_cursor + offset) % count)
            .find(|index| !self.is_failed(*index));

        match chosen {
            Some(index) => {
                self.round_robin_cursor = (index + 1) % count;
                self.node_at(index)
            }
            None => self.get_preferred_node(),
        }
    }

    fn node_at(&self, index: usize) -> Option<(usize, ServerNode)> {
        self.topology.nodes.get(index).map(|n| (index, n.clone()))
    }
}
