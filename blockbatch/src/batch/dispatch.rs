//! Sequential vs parallel dispatch.
//!
//! Consulted once per batch. Parallelism is only used when the server is
//! known to tolerate it for the operation kind and the sub-commands cannot
//! observe each other.

use serde::Serialize;

/// What a batch does, for dispatch purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    /// Region fills.
    Fill,
    /// Arbitrary commands.
    Command,
}

/// Shape of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProfile {
    pub operation: OperationKind,
    pub sub_commands: usize,
    /// Whether later sub-commands depend on earlier ones.
    pub dependent: bool,
}

/// How a batch is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchMode {
    Sequential,
    Parallel { max_in_flight: usize },
}

impl DispatchMode {
    /// Number of sub-commands allowed in flight at once.
    pub fn concurrency(&self) -> usize {
        match self {
            DispatchMode::Sequential => 1,
            DispatchMode::Parallel { max_in_flight } => *max_in_flight,
        }
    }
}

/// Server capabilities that govern dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Connections available.
    pub pool_size: usize,
    pub concurrent_fills: bool,
    pub concurrent_commands: bool,
}

impl DispatchPolicy {
    pub fn decide(&self, profile: &BatchProfile) -> DispatchMode {
        if profile.sub_commands < 2 || self.pool_size <= 1 {
            return DispatchMode::Sequential;
        }
        if profile.dependent {
            return DispatchMode::Sequential;
        }
        let tolerated = match profile.operation {
            OperationKind::Fill => self.concurrent_fills,
            OperationKind::Command => self.concurrent_commands,
        };
        if !tolerated {
            return DispatchMode::Sequential;
        }
        DispatchMode::Parallel {
            max_in_flight: self.pool_size.min(profile.sub_commands),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(pool_size: usize) -> DispatchPolicy {
        DispatchPolicy {
            pool_size,
            concurrent_fills: true,
            concurrent_commands: false,
        }
    }

    fn fills(sub_commands: usize) -> BatchProfile {
        BatchProfile {
            operation: OperationKind::Fill,
            sub_commands,
            dependent: false,
        }
    }

    #[test]
    fn test_single_sub_command_is_sequential() {
        assert_eq!(policy(4).decide(&fills(1)), DispatchMode::Sequential);
    }

    #[test]
    fn test_single_connection_is_sequential() {
        assert_eq!(policy(1).decide(&fills(10)), DispatchMode::Sequential);
    }

    #[test]
    fn test_dependent_batch_is_sequential() {
        let profile = BatchProfile {
            dependent: true,
            ..fills(10)
        };
        assert_eq!(policy(4).decide(&profile), DispatchMode::Sequential);
    }

    #[test]
    fn test_untolerated_kind_is_sequential() {
        let profile = BatchProfile {
            operation: OperationKind::Command,
            ..fills(10)
        };
        assert_eq!(policy(4).decide(&profile), DispatchMode::Sequential);
    }

    #[test]
    fn test_parallel_bounded_by_pool_and_batch() {
        assert_eq!(
            policy(4).decide(&fills(10)),
            DispatchMode::Parallel { max_in_flight: 4 }
        );
        assert_eq!(
            policy(4).decide(&fills(3)),
            DispatchMode::Parallel { max_in_flight: 3 }
        );
        assert_eq!(policy(4).decide(&fills(3)).concurrency(), 3);
    }
}
