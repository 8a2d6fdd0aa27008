/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Dispatch of fully-received inbound PUBLISH packets to application handlers.
 */

use crate::mqtt::PublishPacket;
use crate::mqtt::utils::split_shared_topic_filter;

use log::*;
use std::collections::HashMap;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

/// Result type returned by publish handlers.  Errors are logged by the router and otherwise ignored.
pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Application callback invoked for each matching inbound PUBLISH
pub type PublishHandler = Arc<dyn Fn(&PublishPacket) -> HandlerResult + Send + Sync>;

/// Dispatches inbound PUBLISH packets to application code.
///
/// `route` is invoked from the client's read loop, so implementations should not block.
pub trait Router : Send + Sync {

    /// Registers a handler for a topic filter, replacing any handler already registered for it
    fn register(&self, topic_filter: &str, handler: PublishHandler);

    /// Removes the handler registered for a topic filter, if any
    fn unregister(&self, topic_filter: &str);

    /// Delivers a publish to every interested handler
    fn route(&self, publish: &PublishPacket);
}

/// Returns true if the topic matches the topic filter.  Shared subscription prefixes are stripped
/// from the filter before matching, and wildcards at the first level never match `$`-prefixed topics.
pub fn topic_matches_filter(topic: &str, topic_filter: &str) -> bool {
    let filter = match split_shared_topic_filter(topic_filter) {
        Some((_, filter)) => filter,
        None => topic_filter,
    };

    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let filter_levels: Vec<&str> = filter.split('/').collect();
    let topic_levels: Vec<&str> = topic.split('/').collect();

    let mut index = 0;
    while index < filter_levels.len() {
        let filter_level = filter_levels[index];
        if filter_level == "#" {
            return true;
        }

        if index >= topic_levels.len() {
            return false;
        }

        if filter_level != "+" && filter_level != topic_levels[index] {
            return false;
        }

        index += 1;
    }

    index == topic_levels.len()
}

fn invoke_handler(topic_filter: &str, handler: &PublishHandler, publish: &PublishPacket) {
    match catch_unwind(AssertUnwindSafe(|| (handler)(publish))) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            warn!("Router - handler for \"{}\" failed on topic \"{}\": {}", topic_filter, publish.topic, error);
        }
        Err(_) => {
            error!("Router - handler for \"{}\" panicked on topic \"{}\"", topic_filter, publish.topic);
        }
    }
}

/// Router that matches registered topic filters (with `+` and `#` wildcards) against each
/// publish's topic and delivers to every match
#[derive(Default)]
pub struct StandardRouter {
    handlers: RwLock<HashMap<String, PublishHandler>>,
}

impl StandardRouter {

    /// Creates a new router with no registered handlers
    pub fn new() -> Self {
        StandardRouter {
            handlers: RwLock::new(HashMap::new()),
        }
    }
}

impl Router for StandardRouter {
    fn register(&self, topic_filter: &str, handler: PublishHandler) {
        self.handlers.write().unwrap().insert(topic_filter.to_string(), handler);
    }

    fn unregister(&self, topic_filter: &str) {
        self.handlers.write().unwrap().remove(topic_filter);
    }

    fn route(&self, publish: &PublishPacket) {
        let matches : Vec<(String, PublishHandler)> = self.handlers.read().unwrap().iter()
            .filter(|(topic_filter, _)| topic_matches_filter(&publish.topic, topic_filter))
            .map(|(topic_filter, handler)| (topic_filter.clone(), handler.clone()))
            .collect();

        if matches.is_empty() {
            debug!("StandardRouter - no handler registered for topic \"{}\"", publish.topic);
            return;
        }

        for (topic_filter, handler) in &matches {
            invoke_handler(topic_filter, handler, publish);
        }
    }
}

/// Router that hands every publish to a single callback, regardless of topic
pub struct SingleHandlerRouter {
    handler: PublishHandler,
}

impl SingleHandlerRouter {

    /// Creates a router around a single publish callback
    pub fn new(handler: PublishHandler) -> Self {
        SingleHandlerRouter {
            handler
        }
    }
}

impl Router for SingleHandlerRouter {
    fn register(&self, topic_filter: &str, _: PublishHandler) {
        warn!("SingleHandlerRouter - ignoring handler registration for \"{}\"", topic_filter);
    }

    fn unregister(&self, _: &str) {}

    fn route(&self, publish: &PublishPacket) {
        invoke_handler("#", &self.handler, publish);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::QualityOfService;
    use std::sync::Mutex;

    fn recording_handler(received: &Arc<Mutex<Vec<String>>>, label: &'static str) -> PublishHandler {
        let received = received.clone();
        Arc::new(move |publish: &PublishPacket| -> HandlerResult {
            received.lock().unwrap().push(format!("{}:{}", label, publish.topic));
            Ok(())
        })
    }

    fn publish(topic: &str) -> PublishPacket {
        PublishPacket::builder(topic, QualityOfService::AtMostOnce).build()
    }

    #[test]
    fn topic_matching() {
        assert!(topic_matches_filter("a/b/c", "a/b/c"));
        assert!(topic_matches_filter("a/b/c", "a/+/c"));
        assert!(topic_matches_filter("a/b/c", "a/#"));
        assert!(topic_matches_filter("a", "a/#"));
        assert!(topic_matches_filter("a/b/c", "#"));
        assert!(topic_matches_filter("a/b/c", "$share/group/a/+/c"));
        assert!(!topic_matches_filter("a/b", "a/b/c"));
        assert!(!topic_matches_filter("a/b/c", "a/+"));
        assert!(!topic_matches_filter("a/b/c", "a/c/#"));
        assert!(!topic_matches_filter("$SYS/load", "#"));
        assert!(!topic_matches_filter("$SYS/load", "+/load"));
        assert!(topic_matches_filter("$SYS/load", "$SYS/#"));
    }

    #[test]
    fn standard_router_delivers_to_all_matches() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let router = StandardRouter::new();
        router.register("sensors/+/temp", recording_handler(&received, "temp"));
        router.register("sensors/#", recording_handler(&received, "all"));
        router.register("other", recording_handler(&received, "other"));

        router.route(&publish("sensors/kitchen/temp"));

        let mut deliveries = received.lock().unwrap().clone();
        deliveries.sort();
        assert_eq!(vec!("all:sensors/kitchen/temp".to_string(), "temp:sensors/kitchen/temp".to_string()), deliveries);
    }

    #[test]
    fn unregister_stops_delivery() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let router = StandardRouter::new();
        router.register("a/b", recording_handler(&received, "ab"));
        router.unregister("a/b");
        router.route(&publish("a/b"));

        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_handlers_are_isolated() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let router = StandardRouter::new();
        router.register("a/+", Arc::new(|_: &PublishPacket| -> HandlerResult { panic!("handler bug") }));
        router.register("a/#", Arc::new(|_: &PublishPacket| -> HandlerResult { Err("refused".into()) }));
        router.register("a/b", recording_handler(&received, "ok"));

        router.route(&publish("a/b"));
        router.route(&publish("a/b"));

        assert_eq!(2, received.lock().unwrap().len());
    }

    #[test]
    fn single_handler_router_receives_everything() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let router = SingleHandlerRouter::new(recording_handler(&received, "single"));
        router.register("ignored", recording_handler(&received, "never"));

        router.route(&publish("x/y"));
        router.route(&publish("$SYS/z"));

        assert_eq!(vec!("single:x/y".to_string(), "single:$SYS/z".to_string()), *received.lock().unwrap());
    }
}
