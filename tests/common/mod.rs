#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use coderun::{execution::interpreter, EventSink, Language, Notification, Settings};

#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl Recorder {
    pub fn sink(&self) -> EventSink {
        let log = Arc::clone(&self.log);
        EventSink::blocking(move |n| {
            log.lock().unwrap().push(n.clone());
            Ok(())
        })
    }

    pub fn events(&self) -> Vec<Notification> {
        self.log.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(Notification::kind).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Message(m) => Some(m.content),
                _ => None,
            })
            .collect()
    }
}

pub fn settings(timeout: u64) -> Settings {
    Settings::default().with_max_runtime_seconds(timeout).unwrap()
}

/// Interpreter tests are skipped on hosts without it.
pub fn has_interpreter(language: Language) -> bool {
    let found = interpreter::resolve(language, &Settings::default()).is_ok();
    if !found {
        println!("{language} interpreter not found, skipping");
    }
    found
}
