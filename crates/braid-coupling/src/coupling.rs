//! A single producer-to-consumer binding with a one-slot buffer.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use braid_core::{AccessError, ComponentId, CouplingError, CouplingId, Value, ValueType};

use crate::attribute::Attribute;
use crate::endpoint::{Consumer, Producer};

/// Binds one [`Producer`] to one [`Consumer`] of the same value type.
///
/// Updating a coupling is split in two so the manager can separate
/// reads from writes across all couplings:
///
/// 1. [`set_buffer`](Self::set_buffer) reads the producer into the buffer.
/// 2. [`commit`](Self::commit) writes the buffered value to the consumer.
///
/// The buffer holds only the most recent value. Committing does not
/// clear it, so a second commit rewrites the same value. Committing
/// before anything was ever buffered is a no-op.
pub struct Coupling {
    id: CouplingId,
    producer: Producer,
    consumer: Consumer,
    description: String,
    buffer: Mutex<Option<Value>>,
}

impl Coupling {
    /// Bind `producer` to `consumer`.
    ///
    /// Fails with [`CouplingError::TypeMismatch`] when the two value
    /// types differ.
    pub fn new(producer: Producer, consumer: Consumer) -> Result<Self, CouplingError> {
        if producer.value_type() != consumer.value_type() {
            return Err(CouplingError::TypeMismatch {
                producer: producer.value_type(),
                consumer: consumer.value_type(),
            });
        }
        let description = format!("{} -> {}", producer.description(), consumer.description());
        Ok(Self {
            id: CouplingId::next(),
            producer,
            consumer,
            description,
            buffer: Mutex::new(None),
        })
    }

    /// Unique identifier assigned at construction.
    pub fn id(&self) -> CouplingId {
        self.id
    }

    /// The read side.
    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    /// The write side.
    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// Component the value is read from.
    pub fn source(&self) -> ComponentId {
        self.producer.attribute().component
    }

    /// Component the value is written to.
    pub fn target(&self) -> ComponentId {
        self.consumer.attribute().component
    }

    /// Type of the value carried.
    pub fn value_type(&self) -> ValueType {
        self.producer.value_type()
    }

    /// Producer and consumer attributes, the coupling's structural identity.
    pub fn endpoints(&self) -> (&Attribute, &Attribute) {
        (self.producer.attribute(), self.consumer.attribute())
    }

    /// Human-readable `producer -> consumer` label.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Read the producer and store the value in the buffer.
    ///
    /// On failure the previous buffer content is left untouched.
    pub fn set_buffer(&self) -> Result<(), AccessError> {
        let value = self.producer.read()?;
        *self.buffer.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }

    /// Write the buffered value to the consumer.
    pub fn commit(&self) -> Result<(), AccessError> {
        match self.buffered_value() {
            Some(value) => self.consumer.write(value),
            None => Ok(()),
        }
    }

    /// The value currently in the buffer, if any.
    pub fn buffered_value(&self) -> Option<Value> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PartialEq for Coupling {
    fn eq(&self, other: &Self) -> bool {
        self.endpoints() == other.endpoints()
    }
}

impl Eq for Coupling {}

impl fmt::Debug for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coupling")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("buffer", &self.buffered_value())
            .finish()
    }
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
