use std::fmt;
use std::str::FromStr;

/// nRF52 parts with a known flash layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Nrf52805,
    Nrf52810,
    Nrf52811,
    Nrf52820,
    Nrf52832,
    Nrf52833,
    Nrf52840,
}

impl Variant {
    pub const ALL: [Variant; 7] = [
        Variant::Nrf52805,
        Variant::Nrf52810,
        Variant::Nrf52811,
        Variant::Nrf52820,
        Variant::Nrf52832,
        Variant::Nrf52833,
        Variant::Nrf52840,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Nrf52805 => "nRF52805",
            Variant::Nrf52810 => "nRF52810",
            Variant::Nrf52811 => "nRF52811",
            Variant::Nrf52820 => "nRF52820",
            Variant::Nrf52832 => "nRF52832",
            Variant::Nrf52833 => "nRF52833",
            Variant::Nrf52840 => "nRF52840",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "\"{}\" is not a valid variant", self.0) }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL.iter().copied().find(|v| v.name() == s).ok_or_else(|| UnknownVariant(s.to_owned()))
    }
}

/// Flash addresses the bootloader uses on one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Bootloader start address
    pub bootloader_addr: u32,

    /// Bootloader settings page start address
    pub settings_addr: u32,

    /// Application area start address, including free space
    pub app_area_addr: u32,
}

/// Ordered map of variant to layout. Iteration order decides which candidate wins during resolution.
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    layouts: Vec<(Variant, MemoryLayout)>,
}

impl VariantRegistry {
    pub fn new() -> VariantRegistry { Default::default() }

    /// Add a layout, replacing (in place) any layout already registered for `variant`.
    pub fn insert(&mut self, variant: Variant, layout: MemoryLayout) {
        if let Some(entry) = self.layouts.iter_mut().find(|(v, _)| *v == variant) {
            entry.1 = layout;
        } else {
            self.layouts.push((variant, layout));
        }
    }

    pub fn lookup(&self, variant: Variant) -> Option<&MemoryLayout> {
        self.layouts.iter().find(|(v, _)| *v == variant).map(|(_, l)| l)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variant, &MemoryLayout)> + '_ {
        self.layouts.iter().map(|(v, l)| (*v, l))
    }

    /// Variants other than `origin` whose settings page lives at `settings_addr`.
    pub fn sharing_settings_addr(
        &self,
        origin: Variant,
        settings_addr: u32,
    ) -> impl Iterator<Item = (Variant, &MemoryLayout)> + '_ {
        self.iter().filter(move |(v, l)| *v != origin && l.settings_addr == settings_addr)
    }

    pub fn len(&self) -> usize { self.layouts.len() }

    pub fn is_empty(&self) -> bool { self.layouts.is_empty() }
}

impl FromIterator<(Variant, MemoryLayout)> for VariantRegistry {
    fn from_iter<I: IntoIterator<Item = (Variant, MemoryLayout)>>(iter: I) -> Self {
        let mut registry = VariantRegistry::new();
        for (variant, layout) in iter {
            registry.insert(variant, layout);
        }
        registry
    }
}
