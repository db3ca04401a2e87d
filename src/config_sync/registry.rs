//! # Configuration Variable Registry
//!
//! Maps each exposed [`VariableId`] to an owned accessor: width and access
//! metadata, the registered default, and read/write closures over the
//! variable's backing storage.
//!
//! Backing storage is shared with the rest of the robot firmware. The link
//! runs on one cooperative thread and handlers never run from interrupt
//! context, so plain `Rc<Cell<_>>` sharing is enough; no locking is done
//! here and none must be needed by callers.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;

use crate::error::{Result, RobotLinkError};
use crate::variable::VariableId;

/// Native width of a configuration variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    B8,
    B16,
    B32,
}

impl Width {
    pub fn bits(self) -> u32 {
        match self {
            Width::B8 => 8,
            Width::B16 => 16,
            Width::B32 => 32,
        }
    }

    /// Mask selecting the low `bits()` of a 32-bit slot
    pub fn mask(self) -> u32 {
        match self {
            Width::B8 => 0xFF,
            Width::B16 => 0xFFFF,
            Width::B32 => 0xFFFF_FFFF,
        }
    }
}

/// Remote access rights of a configuration variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    None,
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn can_read(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// Metadata of an exposed configuration variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigVariableDescriptor {
    pub id: VariableId,
    pub width: Width,
    pub access: Access,
    /// Raw default bits, already masked to `width`
    pub default_value: u32,
}

/// Native value types that can back a configuration variable
pub trait ConfigValue: Copy + 'static {
    const WIDTH: Width;

    /// Raw bits, zero-filled above the native width
    fn to_raw(self) -> u32;

    /// Rebuild from raw bits, ignoring anything above the native width
    fn from_raw(raw: u32) -> Self;
}

macro_rules! impl_config_value {
    ($ty:ty, $unsigned:ty, $width:expr) => {
        impl ConfigValue for $ty {
            const WIDTH: Width = $width;

            fn to_raw(self) -> u32 {
                self as $unsigned as u32
            }

            fn from_raw(raw: u32) -> Self {
                raw as $unsigned as $ty
            }
        }
    };
}

impl_config_value!(u8, u8, Width::B8);
impl_config_value!(i8, u8, Width::B8);
impl_config_value!(u16, u16, Width::B16);
impl_config_value!(i16, u16, Width::B16);
impl_config_value!(u32, u32, Width::B32);
impl_config_value!(i32, u32, Width::B32);

impl ConfigValue for f32 {
    const WIDTH: Width = Width::B32;

    fn to_raw(self) -> u32 {
        self.to_bits()
    }

    fn from_raw(raw: u32) -> Self {
        f32::from_bits(raw)
    }
}

impl ConfigValue for bool {
    const WIDTH: Width = Width::B8;

    fn to_raw(self) -> u32 {
        self as u32
    }

    fn from_raw(raw: u32) -> Self {
        raw & 0xFF != 0
    }
}

type ReadFn = Box<dyn Fn() -> u32>;
type WriteFn = Box<dyn FnMut(u32)>;

struct Entry {
    descriptor: ConfigVariableDescriptor,
    read: ReadFn,
    write: WriteFn,
}

/// Registry of configuration variables exposed by an endpoint
#[derive(Default)]
pub struct VariableRegistry {
    entries: HashMap<VariableId, Entry>,
}

impl std::fmt::Debug for VariableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("VariableRegistry").field("variables", &ids).finish()
    }
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a variable backed by shared storage
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier the variable is reachable under
    /// * `access` - Remote access rights
    /// * `default` - Value restored by `SET_DEFAULT`
    /// * `storage` - Backing storage, shared with the firmware
    ///
    /// # Errors
    ///
    /// Returns error if `id` is `VariableId::NONE`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use robot_link::config_sync::registry::{Access, VariableRegistry};
    /// use robot_link::variable::VariableId;
    ///
    /// let kp = Rc::new(Cell::new(1.5f32));
    /// let mut registry = VariableRegistry::new();
    /// registry.register(VariableId::SPEED_KP, Access::ReadWrite, 1.5f32, kp.clone())?;
    /// assert_eq!(registry.read_raw(VariableId::SPEED_KP), Some(1.5f32.to_bits()));
    /// # Ok::<(), robot_link::error::RobotLinkError>(())
    /// ```
    pub fn register<V: ConfigValue>(
        &mut self,
        id: VariableId,
        access: Access,
        default: V,
        storage: Rc<Cell<V>>,
    ) -> Result<()> {
        let reader = storage.clone();
        self.register_with(
            id,
            V::WIDTH,
            access,
            default.to_raw(),
            move || reader.get().to_raw(),
            move |raw| storage.set(V::from_raw(raw)),
        )
    }

    /// Expose a variable through custom accessors
    ///
    /// Use this when writes must be clamped or validated; the value read
    /// back after a write is what gets reported to the requester.
    pub fn register_with<R, W>(
        &mut self,
        id: VariableId,
        width: Width,
        access: Access,
        default_value: u32,
        read: R,
        write: W,
    ) -> Result<()>
    where
        R: Fn() -> u32 + 'static,
        W: FnMut(u32) + 'static,
    {
        if id.is_none() {
            return Err(RobotLinkError::Protocol(
                "Cannot register a variable under VariableId::NONE".to_string(),
            ));
        }

        let descriptor = ConfigVariableDescriptor {
            id,
            width,
            access,
            default_value: default_value & width.mask(),
        };

        let previous = self.entries.insert(
            id,
            Entry {
                descriptor,
                read: Box::new(read),
                write: Box::new(write),
            },
        );
        if previous.is_some() {
            warn!("Variable {} registered twice, replacing previous accessor", id);
        }

        Ok(())
    }

    /// Metadata of a registered variable
    pub fn descriptor(&self, id: VariableId) -> Option<&ConfigVariableDescriptor> {
        self.entries.get(&id).map(|entry| &entry.descriptor)
    }

    /// Current raw value, masked to the variable width
    pub fn read_raw(&self, id: VariableId) -> Option<u32> {
        self.entries
            .get(&id)
            .map(|entry| (entry.read)() & entry.descriptor.width.mask())
    }

    /// Write the low `width` bits of `raw`, returning the value read back
    pub fn write_raw(&mut self, id: VariableId, raw: u32) -> Option<u32> {
        let entry = self.entries.get_mut(&id)?;
        let mask = entry.descriptor.width.mask();
        (entry.write)(raw & mask);
        Some((entry.read)() & mask)
    }

    /// Restore the registered default, returning the value read back
    pub fn reset_default(&mut self, id: VariableId) -> Option<u32> {
        let default_value = self.descriptor(id)?.default_value;
        self.write_raw(id, default_value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_masks() {
        assert_eq!(Width::B8.mask(), 0xFF);
        assert_eq!(Width::B16.mask(), 0xFFFF);
        assert_eq!(Width::B32.mask(), u32::MAX);
        assert_eq!(Width::B16.bits(), 16);
    }

    #[test]
    fn test_access_rights() {
        assert!(Access::Read.can_read());
        assert!(!Access::Read.can_write());
        assert!(Access::Write.can_write());
        assert!(!Access::Write.can_read());
        assert!(Access::ReadWrite.can_read() && Access::ReadWrite.can_write());
        assert!(!Access::None.can_read() && !Access::None.can_write());
    }

    #[test]
    fn test_signed_values_zero_fill_high_bits() {
        assert_eq!((-1i8).to_raw(), 0xFF);
        assert_eq!((-2i16).to_raw(), 0xFFFE);
        assert_eq!(i8::from_raw(0xFF), -1);
        assert_eq!(i16::from_raw(0xABCD_FFFE), -2);
    }

    #[test]
    fn test_register_and_read() {
        let temperature = Rc::new(Cell::new(37u8));
        let mut registry = VariableRegistry::new();
        registry
            .register(VariableId::KICKER_TEMPERATURE, Access::Read, 0u8, temperature.clone())
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.read_raw(VariableId::KICKER_TEMPERATURE), Some(37));

        // Firmware updates are visible through the registry
        temperature.set(40);
        assert_eq!(registry.read_raw(VariableId::KICKER_TEMPERATURE), Some(40));
    }

    #[test]
    fn test_write_is_width_aware() {
        let limit = Rc::new(Cell::new(0u16));
        let mut registry = VariableRegistry::new();
        registry
            .register(VariableId::MOTOR_CURRENT_LIMIT, Access::ReadWrite, 500u16, limit.clone())
            .unwrap();

        assert_eq!(registry.write_raw(VariableId::MOTOR_CURRENT_LIMIT, 0xDEAD_1234), Some(0x1234));
        assert_eq!(limit.get(), 0x1234);
    }

    #[test]
    fn test_reset_default() {
        let kp = Rc::new(Cell::new(9.0f32));
        let mut registry = VariableRegistry::new();
        registry.register(VariableId::SPEED_KP, Access::ReadWrite, 2.5f32, kp.clone()).unwrap();

        assert_eq!(registry.reset_default(VariableId::SPEED_KP), Some(2.5f32.to_bits()));
        assert_eq!(kp.get(), 2.5);
    }

    #[test]
    fn test_custom_accessor_clamps() {
        let channel = Rc::new(Cell::new(76u8));
        let reader = channel.clone();
        let writer = channel.clone();
        let mut registry = VariableRegistry::new();
        registry
            .register_with(
                VariableId::RADIO_CHANNEL,
                Width::B8,
                Access::ReadWrite,
                76,
                move || reader.get() as u32,
                move |raw| writer.set((raw as u8).min(125)),
            )
            .unwrap();

        assert_eq!(registry.write_raw(VariableId::RADIO_CHANNEL, 200), Some(125));
        assert_eq!(channel.get(), 125);
    }

    #[test]
    fn test_register_none_rejected() {
        let mut registry = VariableRegistry::new();
        let result = registry.register(VariableId::NONE, Access::Read, 0u8, Rc::new(Cell::new(0u8)));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_variable() {
        let mut registry = VariableRegistry::new();
        assert!(registry.descriptor(VariableId::SPEED_KD).is_none());
        assert_eq!(registry.read_raw(VariableId::SPEED_KD), None);
        assert_eq!(registry.write_raw(VariableId::SPEED_KD, 1), None);
        assert_eq!(registry.reset_default(VariableId::SPEED_KD), None);
    }

    #[test]
    fn test_default_masked_to_width() {
        let mut registry = VariableRegistry::new();
        registry
            .register_with(VariableId::ROBOT_ID, Width::B8, Access::Read, 0x1FF, || 0, |_| {})
            .unwrap();
        assert_eq!(registry.descriptor(VariableId::ROBOT_ID).unwrap().default_value, 0xFF);
    }
}
