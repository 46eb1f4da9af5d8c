// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// API group and version served by the Hello CRD
pub const HELLO_GROUP: &str = "unusualfor.com";
pub const HELLO_VERSION: &str = "v1";
pub const HELLO_KIND: &str = "Hello";

/// Kind and name prefix of the child each Hello owns
pub const CHILD_KIND: &str = "ConfigMap";
pub const CHILD_PREFIX: &str = "hello";

/// Key in the child's data holding the rendered greeting
pub const GREETING_KEY: &str = "greeting";
/// Greeted person when `spec.name` is unset
pub const DEFAULT_PERSON: &str = "world";

/// Labels put on every managed child
pub mod labels {
    pub const APP: &str = "app";
    pub const APP_VALUE: &str = "hello-operator";
    /// Selector matching every managed child
    pub const SELECTOR: &str = "app=hello-operator";
}

/// Annotation keys used by the operator
pub mod annotations {
    /// Name of the Hello that owns a child
    pub const OWNER: &str = "unusualfor.com/owner";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
