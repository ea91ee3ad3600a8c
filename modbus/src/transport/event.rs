use super::{Request, Response};
use crate::frame::prelude::*;
use log::{debug, error, info, trace, warn};
use std::fmt::Debug;

#[allow(dead_code)]
#[derive(Debug)]
enum Event<'a> {
    Input {
        peer: &'a dyn Debug,
        bytes: &'a [u8],
    },
    Output {
        peer: &'a dyn Debug,
        bytes: &'a [u8],
    },
    Request {
        peer: &'a dyn Debug,
        uuid: u128,
        frame: &'a RequestFrame,
    },
    Response {
        peer: &'a dyn Debug,
        uuid: u128,
        frame: &'a ResponseFrame,
    },
    Dropped {
        peer: &'a dyn Debug,
        reason: &'a dyn Debug,
    },
    Failed {
        peer: &'a dyn Debug,
        error: &'a dyn Debug,
    },
    Connection {
        peer: &'a dyn Debug,
        state: &'a str,
    },
}

/// Transport activity: raw bytes at trace, decoded frames at debug.
pub(crate) struct EventLog {}

impl EventLog {
    pub fn input(peer: &dyn Debug, bytes: &[u8]) {
        trace!("{:?}", Event::Input { peer, bytes });
    }

    pub fn output(peer: &dyn Debug, bytes: &[u8]) {
        trace!("{:?}", Event::Output { peer, bytes });
    }

    pub fn request(peer: &dyn Debug, msg: &Request) {
        let event = Event::Request {
            peer,
            uuid: msg.uuid.as_u128(),
            frame: &msg.frame,
        };
        debug!("{:?}", event);
    }

    pub fn response(peer: &dyn Debug, msg: &Response) {
        let event = Event::Response {
            peer,
            uuid: msg.uuid.as_u128(),
            frame: &msg.frame,
        };
        debug!("{:?}", event);
    }

    /// Input or response that is thrown away
    pub fn dropped(peer: &dyn Debug, reason: &dyn Debug) {
        warn!("{:?}", Event::Dropped { peer, reason });
    }

    pub fn error(peer: &dyn Debug, error: &dyn Debug) {
        error!("{:?}", Event::Failed { peer, error });
    }

    pub fn connection(peer: &dyn Debug, state: &str) {
        info!("{:?}", Event::Connection { peer, state });
    }
}
