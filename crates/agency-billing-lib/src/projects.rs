use crate::data_structures::{Money, ProjectCategory, ProjectChargeLine, ProjectRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectCreditAllocation {
    /// Charge lines in (completion date, id) order.
    pub lines: Vec<ProjectChargeLine>,
    pub savings_by_category: BTreeMap<ProjectCategory, Money>,
    pub credits_applied: u32,
}

impl ProjectCreditAllocation {
    pub fn total_savings(&self) -> Money {
        self.savings_by_category.values().copied().sum()
    }
}

/// Grants the first delivery of each eligible category in a month for free.
#[derive(Debug, Clone)]
pub struct ProjectCreditAllocator {
    eligible: BTreeSet<ProjectCategory>,
}

impl ProjectCreditAllocator {
    pub fn new(eligible: BTreeSet<ProjectCategory>) -> Self {
        Self { eligible }
    }

    pub fn is_eligible(&self, category: ProjectCategory) -> bool {
        self.eligible.contains(&category)
    }

    /// Expects the projects of a single completion month.
    pub fn allocate(&self, projects: &[ProjectRecord]) -> ProjectCreditAllocation {
        let mut ordered: Vec<&ProjectRecord> = projects.iter().collect();
        ordered.sort_by(|a, b| {
            a.completion_date()
                .cmp(&b.completion_date())
                .then_with(|| a.id().cmp(b.id()))
        });

        let mut credited: BTreeSet<ProjectCategory> = BTreeSet::new();
        let mut savings_by_category: BTreeMap<ProjectCategory, Money> = self
            .eligible
            .iter()
            .map(|category| (*category, Decimal::ZERO))
            .collect();

        let lines: Vec<ProjectChargeLine> = ordered
            .into_iter()
            .map(|project| {
                let category = project.category();
                let is_free_credit = self.is_eligible(category) && credited.insert(category);
                let amount = if is_free_credit {
                    Decimal::ZERO
                } else {
                    project.base_amount()
                };
                if is_free_credit {
                    *savings_by_category.entry(category).or_default() += project.base_amount();
                }

                ProjectChargeLine {
                    project: project.clone(),
                    is_free_credit,
                    amount,
                }
            })
            .collect();

        ProjectCreditAllocation {
            lines,
            credits_applied: credited.len() as u32,
            savings_by_category,
        }
    }
}
