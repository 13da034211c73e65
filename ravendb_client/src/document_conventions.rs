use std::{path::PathBuf, time::Duration};

/// How read requests are spread over the nodes of a database.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReadBalanceBehavior {
    /// Every request goes to the preferred node.
    #[default]
    None,
    /// Reads rotate across all healthy nodes.
    RoundRobin,
    /// Reads go to the node that won the last speed test.
    FastestNode,
}

/// Client side settings shared by every request executor of a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Clone)]
pub struct DocumentConventions {
    read_balance_behavior: ReadBalanceBehavior,
    request_timeout: Duration,
    max_number_of_requests_per_session: u32,
    disable_topology_updates: bool,
    topology_refresh_interval: Duration,
    failed_node_check_interval: Duration,
    speed_test_interval: Duration,
    topology_cache_location: Option<PathBuf>,
    send_application_identifier: bool,
}

impl Default for DocumentConventions {
    fn default() -> Self {
        Self {
            read_balance_behavior: ReadBalanceBehavior::default(),
            request_timeout: Duration::from_secs(30),
            max_number_of_requests_per_session: 30,
            disable_topology_updates: false,
            topology_refresh_interval: Duration::from_secs(5 * 60),
            failed_node_check_interval: Duration::from_secs(5),
            speed_test_interval: Duration::from_secs(60),
            topology_cache_location: Some(std::env::temp_dir().join("ravendb_client")),
            send_application_identifier: true,
        }
    }
}

// Mutators
impl DocumentConventions {
    /// Conventions for talking to exactly one server and never asking it for a topology.
    pub fn default_for_single_server() -> Self {
        Self {
            disable_topology_updates: true,
            send_application_identifier: false,
            ..Default::default()
        }
    }

    pub fn set_read_balance_behavior(mut self, behavior: ReadBalanceBehavior) -> Self {
        self.read_balance_behavior = behavior;
        self
    }

    pub fn set_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn set_max_number_of_requests_per_session(mut self, max: u32) -> Self {
        self.max_number_of_requests_per_session = max;
        self
    }

    pub fn set_disable_topology_updates(mut self, disable: bool) -> Self {
        self.disable_topology_updates = disable;
        self
    }

    pub fn set_topology_refresh_interval(mut self, interval: Duration) -> Self {
        self.topology_refresh_interval = interval;
        self
    }

    pub fn set_failed_node_check_interval(mut self, interval: Duration) -> Self {
        self.failed_node_check_interval = interval;
        self
    }

    pub fn set_speed_test_interval(mut self, interval: Duration) -> Self {
        self.speed_test_interval = interval;
        self
    }

    /// Directory the topology cache lives in. `None` turns caching off.
    pub fn set_topology_cache_location(mut self, location: Option<PathBuf>) -> Self {
        self.topology_cache_location = location;
        self
    }

    pub fn set_send_application_identifier(mut self, send: bool) -> Self {
        self.send_application_identifier = send;
        self
    }
}

// Getters
impl DocumentConventions {
    pub fn read_balance_behavior(&self) -> ReadBalanceBehavior {
        self.read_balance_behavior
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_number_of_requests_per_session(&self) -> u32 {
        self.max_number_of_requests_per_session
    }

    pub fn disable_topology_updates(&self) -> bool {
        self.disable_topology_updates
    }

    pub fn topology_refresh_interval(&self) -> Duration {
        self.topology_refresh_interval
    }

    pub fn failed_node_check_interval(&self) -> Duration {
        self.failed_node_check_interval
    }

    pub fn speed_test_interval(&self) -> Duration {
        self.speed_test_interval
    }

    pub fn topology_cache_location(&self) -> Option<&PathBuf> {
        self.topology_cache_location.as_ref()
    }

    pub fn send_application_identifier(&self) -> bool {
        self.send_application_identifier
    }
}
