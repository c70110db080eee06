// Default value functions

pub fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

pub fn default_batch_threshold() -> usize {
    2 // Batches of two or more records group index writes by value
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}

pub fn default_true() -> bool {
    true
}
