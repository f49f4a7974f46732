use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A resource whose consumption is metered against a plan limit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MeteredResource {
    Schools,
    Users,
    AppointmentsThisMonth,
    GalleryItems,
    PostsThisMonth,
    StorageMb,
}

impl MeteredResource {
    pub fn all() -> &'static [MeteredResource] {
        &[
            MeteredResource::Schools,
            MeteredResource::Users,
            MeteredResource::AppointmentsThisMonth,
            MeteredResource::GalleryItems,
            MeteredResource::PostsThisMonth,
            MeteredResource::StorageMb,
        ]
    }
}

/// Resource limits defined by a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_schools: i64,
    pub max_users: i64,
    pub max_appointments_per_month: i64,
    pub max_gallery_items: i64,
    pub max_posts_per_month: i64,
    pub storage_quota_mb: i64,
}

impl PlanLimits {
    pub fn limit_for(&self, resource: MeteredResource) -> i64 {
        match resource {
            MeteredResource::Schools => self.max_schools,
            MeteredResource::Users => self.max_users,
            MeteredResource::AppointmentsThisMonth => self.max_appointments_per_month,
            MeteredResource::GalleryItems => self.max_gallery_items,
            MeteredResource::PostsThisMonth => self.max_posts_per_month,
            MeteredResource::StorageMb => self.storage_quota_mb,
        }
    }

    /// Returns the first resource with a negative limit, if any.
    pub fn first_negative(&self) -> Option<MeteredResource> {
        MeteredResource::all()
            .iter()
            .copied()
            .find(|r| self.limit_for(*r) < 0)
    }
}

/// Live usage counters stored on a subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub schools: i64,
    pub users: i64,
    pub appointments_this_month: i64,
    pub gallery_items: i64,
    pub posts_this_month: i64,
    pub storage_used_mb: i64,
}

impl UsageCounters {
    pub fn used_for(&self, resource: MeteredResource) -> i64 {
        match resource {
            MeteredResource::Schools => self.schools,
            MeteredResource::Users => self.users,
            MeteredResource::AppointmentsThisMonth => self.appointments_this_month,
            MeteredResource::GalleryItems => self.gallery_items,
            MeteredResource::PostsThisMonth => self.posts_this_month,
            MeteredResource::StorageMb => self.storage_used_mb,
        }
    }
}

/// Signed changes to apply to usage counters. Missing fields mean "no change".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageDeltas {
    pub schools: i64,
    pub users: i64,
    pub appointments_this_month: i64,
    pub gallery_items: i64,
    pub posts_this_month: i64,
    pub storage_used_mb: i64,
}

impl UsageDeltas {
    pub fn delta_for(&self, resource: MeteredResource) -> i64 {
        match resource {
            MeteredResource::Schools => self.schools,
            MeteredResource::Users => self.users,
            MeteredResource::AppointmentsThisMonth => self.appointments_this_month,
            MeteredResource::GalleryItems => self.gallery_items,
            MeteredResource::PostsThisMonth => self.posts_this_month,
            MeteredResource::StorageMb => self.storage_used_mb,
        }
    }

    pub fn is_empty(&self) -> bool {
        MeteredResource::all()
            .iter()
            .all(|r| self.delta_for(*r) == 0)
    }

    /// Apply the deltas to `counters`, saturating every counter at zero.
    pub fn apply_to(&self, counters: &UsageCounters) -> UsageCounters {
        UsageCounters {
            schools: clamped_add(counters.schools, self.schools),
            users: clamped_add(counters.users, self.users),
            appointments_this_month: clamped_add(
                counters.appointments_this_month,
                self.appointments_this_month,
            ),
            gallery_items: clamped_add(counters.gallery_items, self.gallery_items),
            posts_this_month: clamped_add(counters.posts_this_month, self.posts_this_month),
            storage_used_mb: clamped_add(counters.storage_used_mb, self.storage_used_mb),
        }
    }
}

fn clamped_add(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}

/// Used/limit pair for one metered resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    pub resource: MeteredResource,
    pub used: i64,
    pub limit: i64,
}

/// Pair every metered resource's counter with its plan limit.
pub fn usage_report(counters: &UsageCounters, limits: &PlanLimits) -> Vec<ResourceUsage> {
    MeteredResource::all()
        .iter()
        .map(|r| ResourceUsage {
            resource: *r,
            used: counters.used_for(*r),
            limit: limits.limit_for(*r),
        })
        .collect()
}
