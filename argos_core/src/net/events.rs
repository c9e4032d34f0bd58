//! Event-stream message vocabulary
//!
//! Builders and parsers for the messages a sensor node emits: person
//! lifecycle (`personEntered`, `personUpdated`, `personLeft`) and zone
//! occupancy (`triggerzoneUpdate`). Spatial values are normalized on the
//! wire: x and y by the sensor grid dimensions, z by the depth range, so
//! consumers need no knowledge of the sensor model.
//!
//! Messages are self-describing tag sequences. Parsers walk string tags
//! and skip unknown ones, so a newer sensor can add tags without breaking
//! an older controller. The `fseq` tag carries the frame sequence number
//! as a decimal string and is always last.

use argos_types::{PersonSnapshot, Vec3};
use log::warn;

use crate::error::{ArgosError, ArgosResult};
use crate::net::protocol::{Arg, EventMessage};

pub const ADDR_PERSON_ENTERED: &str = "personEntered";
pub const ADDR_PERSON_UPDATED: &str = "personUpdated";
pub const ADDR_PERSON_LEFT: &str = "personLeft";
pub const ADDR_ZONE_UPDATE: &str = "triggerzoneUpdate";

/// Depth normalization divisor, mm. Matches the sensor's maximum range.
pub const DEPTH_NORM: f32 = 8000.0;

/// Only every k-th contour point goes on the wire.
pub const CONTOUR_DECIMATION: usize = 4;

/// A parsed event-stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum EventUpdate {
    /// Person entered or moved; fields are wire-normalized.
    Person {
        entered: bool,
        person: PersonSnapshot,
        fseq: u64,
    },
    PersonLeft {
        local_id: u32,
    },
    Zone {
        zone_id: String,
        points_inside: u32,
        /// (sensor-local person id, points) pairs
        per_person: Vec<(u32, u32)>,
        fseq: u64,
    },
}

/*-------------- Builders (sensor side) --------------*/

/// Build a `personEntered` or `personUpdated` message.
pub fn person_message(
    entered: bool,
    person: &PersonSnapshot,
    width: u32,
    height: u32,
    fseq: u64,
) -> EventMessage {
    let w = width as f32;
    let h = height as f32;
    let mut msg = EventMessage::new(if entered {
        ADDR_PERSON_ENTERED
    } else {
        ADDR_PERSON_UPDATED
    });
    msg.push_str("set")
        .push_int(person.local_id as i32)
        .push_int(person.age as i32);

    for (tag, v) in [
        ("centroid", person.centroid),
        ("velocity", person.velocity),
        ("acceleration", person.acceleration),
        ("center", person.center),
    ] {
        msg.push_str(tag)
            .push_float(v.x / w)
            .push_float(v.y / h)
            .push_float(v.z / DEPTH_NORM);
    }

    msg.push_str("contour");
    for point in person.contour.iter().step_by(CONTOUR_DECIMATION) {
        msg.push_float(point.x / w)
            .push_float(point.y / h)
            .push_float(point.z / DEPTH_NORM);
    }

    msg.push_str("fseq").push_str(fseq.to_string());
    msg
}

/// Build a `personLeft` message. Leaves are terminal, so they carry no
/// state and no sequence number.
pub fn person_left_message(local_id: u32) -> EventMessage {
    let mut msg = EventMessage::new(ADDR_PERSON_LEFT);
    msg.push_int(local_id as i32);
    msg
}

/// Build a `triggerzoneUpdate` message.
pub fn zone_update_message(
    zone_id: &str,
    points_inside: u32,
    per_person: &[(u32, u32)],
    fseq: u64,
) -> EventMessage {
    let mut msg = EventMessage::new(ADDR_ZONE_UPDATE);
    msg.push_str("set")
        .push_str(zone_id)
        .push_int(points_inside as i32);
    for &(person_id, points) in per_person {
        msg.push_int(person_id as i32).push_int(points as i32);
    }
    msg.push_str("fseq").push_str(fseq.to_string());
    msg
}

/*-------------- Parser (controller side) --------------*/

/// Parse a decoded wire message into an [`EventUpdate`].
pub fn parse_event(msg: &EventMessage) -> ArgosResult<EventUpdate> {
    match msg.address.as_str() {
        ADDR_PERSON_ENTERED => parse_person(msg, true),
        ADDR_PERSON_UPDATED => parse_person(msg, false),
        ADDR_PERSON_LEFT => parse_person_left(msg),
        ADDR_ZONE_UPDATE => parse_zone_update(msg),
        other => Err(ArgosError::parse(format!("unknown event address '{other}'"))),
    }
}

fn parse_person(msg: &EventMessage, entered: bool) -> ArgosResult<EventUpdate> {
    let mut walker = ArgWalker::new(&msg.args, &msg.address);
    walker.expect_tag("set")?;
    let local_id = walker.int()? as u32;
    let age = walker.int()? as u32;

    let mut person = PersonSnapshot::new(local_id, age);
    let mut fseq = None;

    while let Some(tag) = walker.next_tag() {
        match tag.as_str() {
            "centroid" => person.centroid = walker.vec3()?,
            "velocity" => person.velocity = walker.vec3()?,
            "acceleration" => person.acceleration = walker.vec3()?,
            "center" => person.center = walker.vec3()?,
            "contour" => {
                person.contour.clear();
                while let Some(x) = walker.peek_float() {
                    walker.advance();
                    let y = walker.float()?;
                    let z = walker.float()?;
                    person.contour.push(Vec3::new(x, y, z));
                }
            }
            "fseq" => {
                fseq = Some(walker.fseq()?);
                break;
            }
            other => {
                warn!("{}: skipping unknown tag '{other}'", msg.address);
                walker.skip_values();
            }
        }
    }

    let fseq = fseq.ok_or_else(|| ArgosError::parse(format!("{} without fseq", msg.address)))?;
    Ok(EventUpdate::Person {
        entered,
        person,
        fseq,
    })
}

fn parse_person_left(msg: &EventMessage) -> ArgosResult<EventUpdate> {
    let mut walker = ArgWalker::new(&msg.args, &msg.address);
    let local_id = walker.int()? as u32;
    Ok(EventUpdate::PersonLeft { local_id })
}

fn parse_zone_update(msg: &EventMessage) -> ArgosResult<EventUpdate> {
    let mut walker = ArgWalker::new(&msg.args, &msg.address);
    walker.expect_tag("set")?;
    let zone_id = walker.string()?;
    let points_inside = walker.int()? as u32;

    let mut per_person = Vec::new();
    loop {
        match walker.next_tag() {
            Some(tag) if tag == "fseq" => break,
            Some(other) => {
                warn!("{}: skipping unknown tag '{other}'", msg.address);
                walker.skip_values();
            }
            None => {
                // Pairs of ints until the fseq tag.
                let person_id = walker.int()? as u32;
                let points = walker.int()? as u32;
                per_person.push((person_id, points));
            }
        }
    }
    let fseq = walker.fseq()?;

    Ok(EventUpdate::Zone {
        zone_id,
        points_inside,
        per_person,
        fseq,
    })
}

/// Tag-walking reader over a message's argument list.
struct ArgWalker<'a> {
    args: &'a [Arg],
    pos: usize,
    address: &'a str,
}

impl<'a> ArgWalker<'a> {
    fn new(args: &'a [Arg], address: &'a str) -> Self {
        Self {
            args,
            pos: 0,
            address,
        }
    }

    fn err(&self, what: &str) -> ArgosError {
        ArgosError::parse(format!(
            "{}: expected {what} at argument {}",
            self.address, self.pos
        ))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Consume the next argument if it is a string tag.
    fn next_tag(&mut self) -> Option<String> {
        match self.args.get(self.pos) {
            Some(Arg::Str(s)) => {
                self.pos += 1;
                Some(s.clone())
            }
            _ => None,
        }
    }

    fn expect_tag(&mut self, tag: &str) -> ArgosResult<()> {
        match self.next_tag() {
            Some(t) if t == tag => Ok(()),
            _ => Err(self.err(&format!("tag '{tag}'"))),
        }
    }

    fn int(&mut self) -> ArgosResult<i32> {
        let v = self
            .args
            .get(self.pos)
            .and_then(Arg::as_int)
            .ok_or_else(|| self.err("int"))?;
        self.pos += 1;
        Ok(v)
    }

    fn float(&mut self) -> ArgosResult<f32> {
        let v = self
            .args
            .get(self.pos)
            .and_then(Arg::as_float)
            .ok_or_else(|| self.err("float"))?;
        self.pos += 1;
        Ok(v)
    }

    fn string(&mut self) -> ArgosResult<String> {
        let v = self
            .args
            .get(self.pos)
            .and_then(Arg::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.err("string"))?;
        self.pos += 1;
        Ok(v)
    }

    fn peek_float(&self) -> Option<f32> {
        self.args.get(self.pos).and_then(Arg::as_float)
    }

    fn vec3(&mut self) -> ArgosResult<Vec3> {
        Ok(Vec3::new(self.float()?, self.float()?, self.float()?))
    }

    /// Parse the decimal-string frame sequence number.
    fn fseq(&mut self) -> ArgosResult<u64> {
        let s = self.string()?;
        s.parse()
            .map_err(|e| ArgosError::parse(format!("{}: bad fseq '{s}': {e}", self.address)))
    }

    /// Skip the values following an unknown tag, up to the next tag.
    fn skip_values(&mut self) {
        while matches!(
            self.args.get(self.pos),
            Some(Arg::Int(_)) | Some(Arg::Float(_))
        ) {
            self.pos += 1;
        }
    }
}
