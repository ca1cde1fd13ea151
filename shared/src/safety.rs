use crate::facility::{Facility, FacilityKind};

/// Neighbourhood safety score over the facilities currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SafetyScore(u8);

impl SafetyScore {
    pub const MAX: u8 = 99;

    /// Weighted sum over the visible set, capped at [`Self::MAX`]. Order-independent.
    pub fn from_facilities<'a>(facilities: impl IntoIterator<Item = &'a Facility>) -> Self {
        let total: u32 = facilities
            .into_iter()
            .map(|f| f.kind.map_or(0, Self::weight))
            .fold(0u32, u32::saturating_add);
        Self(total.min(Self::MAX as u32) as u8)
    }

    fn weight(kind: FacilityKind) -> u32 {
        match kind {
            FacilityKind::Police | FacilityKind::Fire => 10,
            FacilityKind::Hospital => 5,
            FacilityKind::Shelter => 2,
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn grade(self) -> SafetyGrade {
        SafetyGrade::from_score(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyGrade {
    VerySafe,
    Moderate,
    Vulnerable,
}

impl SafetyGrade {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            Self::VerySafe
        } else if score >= 50 {
            Self::Moderate
        } else {
            Self::Vulnerable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VerySafe => "매우 안전",
            Self::Moderate => "보통",
            Self::Vulnerable => "취약",
        }
    }

    pub fn color_hex(self) -> &'static str {
        match self {
            Self::VerySafe => "#28a745",
            Self::Moderate => "#ffc107",
            Self::Vulnerable => "#d9534f",
        }
    }
}
