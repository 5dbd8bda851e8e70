pub mod rate_limit_pruner;
