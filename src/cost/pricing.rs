//! Monthly on-demand price table (USD, us-east-1 list prices).

use crate::types::cost::CostConfidence;

/// Billable resource family, one estimate per family per analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Ec2,
    Rds,
    Lambda,
    S3,
    Ecs,
    LoadBalancer,
    NatGateway,
    Elasticache,
}

const EC2_PRICES: &[(&str, f64)] = &[
    ("t3.nano", 3.80),
    ("t3.micro", 7.59),
    ("t3.small", 15.18),
    ("t3.medium", 30.37),
    ("t3.large", 60.74),
    ("t3.xlarge", 121.47),
    ("t2.micro", 8.47),
    ("t2.small", 16.94),
    ("t2.medium", 33.87),
    ("m5.large", 70.08),
    ("m5.xlarge", 140.16),
    ("m5.2xlarge", 280.32),
    ("c5.large", 62.05),
    ("c5.xlarge", 124.10),
    ("r5.large", 91.98),
];

const RDS_PRICES: &[(&str, f64)] = &[
    ("db.t3.micro", 12.41),
    ("db.t3.small", 24.82),
    ("db.t3.medium", 49.64),
    ("db.t3.large", 99.28),
    ("db.m5.large", 124.10),
    ("db.r5.large", 175.20),
];

const ELASTICACHE_PRICES: &[(&str, f64)] = &[
    ("cache.t3.micro", 12.41),
    ("cache.t3.small", 24.82),
    ("cache.m5.large", 113.88),
];

impl ResourceKind {
    /// Name used as `resourceType` in estimates.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Ec2 => "ec2",
            ResourceKind::Rds => "rds",
            ResourceKind::Lambda => "lambda",
            ResourceKind::S3 => "s3",
            ResourceKind::Ecs => "ecs",
            ResourceKind::LoadBalancer => "load_balancer",
            ResourceKind::NatGateway => "nat_gateway",
            ResourceKind::Elasticache => "elasticache",
        }
    }

    /// Fixed-rate resources are priced with high confidence, sized ones with
    /// medium, usage-billed ones with low.
    pub fn confidence(&self) -> CostConfidence {
        match self {
            ResourceKind::LoadBalancer | ResourceKind::NatGateway => CostConfidence::High,
            ResourceKind::Ec2 | ResourceKind::Rds | ResourceKind::Ecs | ResourceKind::Elasticache => {
                CostConfidence::Medium
            }
            ResourceKind::Lambda | ResourceKind::S3 => CostConfidence::Low,
        }
    }

    fn size_table(&self) -> &'static [(&'static str, f64)] {
        match self {
            ResourceKind::Ec2 => EC2_PRICES,
            ResourceKind::Rds => RDS_PRICES,
            ResourceKind::Elasticache => ELASTICACHE_PRICES,
            _ => &[],
        }
    }

    /// Whether the price depends on an instance or node class.
    pub fn is_sized(&self) -> bool {
        !self.size_table().is_empty()
    }

    pub fn base_price(&self) -> f64 {
        match self {
            ResourceKind::Ec2 => 30.37,
            ResourceKind::Rds => 49.64,
            ResourceKind::Lambda => 5.00,
            ResourceKind::S3 => 2.30,
            ResourceKind::Ecs => 35.00,
            ResourceKind::LoadBalancer => 16.43,
            ResourceKind::NatGateway => 32.85,
            ResourceKind::Elasticache => 24.82,
        }
    }

    /// Price for a given size, falling back to the base price for unknown or
    /// missing sizes.
    pub fn price_for(&self, size: Option<&str>) -> f64 {
        size.and_then(|s| {
            let s = s.trim().to_ascii_lowercase();
            self.size_table()
                .iter()
                .find(|(name, _)| *name == s)
                .map(|(_, price)| *price)
        })
        .unwrap_or_else(|| self.base_price())
    }

    pub fn knows_size(&self, size: &str) -> bool {
        let size = size.trim().to_ascii_lowercase();
        self.size_table().iter().any(|(name, _)| *name == size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_lookup() {
        assert_eq!(ResourceKind::Ec2.price_for(Some("t3.large")), 60.74);
        assert_eq!(ResourceKind::Ec2.price_for(Some("T3.Micro")), 7.59);
        assert_eq!(ResourceKind::Rds.price_for(Some("db.r5.large")), 175.20);
        assert_eq!(ResourceKind::Elasticache.price_for(Some("cache.m5.large")), 113.88);
    }

    #[test]
    fn test_unknown_size_uses_base_price() {
        assert_eq!(ResourceKind::Ec2.price_for(Some("z9.huge")), 30.37);
        assert_eq!(ResourceKind::Ec2.price_for(None), 30.37);
        assert_eq!(ResourceKind::LoadBalancer.price_for(Some("t3.large")), 16.43);
    }

    #[test]
    fn test_confidence_policy() {
        assert_eq!(ResourceKind::LoadBalancer.confidence(), CostConfidence::High);
        assert_eq!(ResourceKind::Ec2.confidence(), CostConfidence::Medium);
        assert_eq!(ResourceKind::Rds.confidence(), CostConfidence::Medium);
        assert_eq!(ResourceKind::Lambda.confidence(), CostConfidence::Low);
        assert!(ResourceKind::Ec2.is_sized());
        assert!(!ResourceKind::Lambda.is_sized());
    }
}
