//! Infrastructure cost estimation for infrastructure-as-code changes.

pub mod detector;
pub mod pricing;

use crate::types::cost::{CostEstimate, DevOpsAnalysis};
use crate::types::git::FileDiff;
use detector::{classify_file, detect_resources};
use pricing::ResourceKind;

/// Sizes seen for one resource family, in discovery order.
struct Sighting {
    kind: ResourceKind,
    declarations: usize,
    sizes: Vec<String>,
}

impl Sighting {
    fn estimate(&self) -> CostEstimate {
        // The costliest declared size stands for the family.
        let cost = if self.sizes.is_empty() {
            self.kind.base_price()
        } else {
            self.sizes
                .iter()
                .map(|s| self.kind.price_for(Some(s)))
                .fold(f64::MIN, f64::max)
        };

        let mut details = format!(
            "{} declaration{}",
            self.declarations,
            if self.declarations == 1 { "" } else { "s" }
        );
        if !self.sizes.is_empty() {
            details.push_str(&format!(": {}", self.sizes.join(", ")));
        } else if self.kind.is_sized() {
            details.push_str(", size not specified");
        }
        let unknown: Vec<&str> = self
            .sizes
            .iter()
            .filter(|s| !self.kind.knows_size(s))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            details.push_str(&format!(" (unpriced: {}, base rate used)", unknown.join(", ")));
        }

        CostEstimate {
            resource_type: self.kind.as_str().to_string(),
            estimated_new_cost: cost,
            confidence: self.kind.confidence(),
            details: Some(details),
        }
    }
}

/// Classifies each file and prices the resources declared in IaC files.
///
/// Resource declarations collapse by family: two `aws_instance` blocks yield a
/// single `ec2` estimate.
pub fn analyze_devops_files(files: &[FileDiff]) -> DevOpsAnalysis {
    let mut file_types = Vec::new();
    let mut sightings: Vec<Sighting> = Vec::new();

    for file in files {
        let Some(file_type) = classify_file(&file.path, &file.diff) else {
            continue;
        };
        if !file_types.contains(&file_type) {
            file_types.push(file_type);
        }
        if !file_type.declares_resources() {
            continue;
        }

        for declaration in detect_resources(file_type, &file.diff) {
            let idx = match sightings.iter().position(|s| s.kind == declaration.kind) {
                Some(idx) => idx,
                None => {
                    sightings.push(Sighting {
                        kind: declaration.kind,
                        declarations: 0,
                        sizes: Vec::new(),
                    });
                    sightings.len() - 1
                }
            };
            let sighting = &mut sightings[idx];
            sighting.declarations += 1;
            if let Some(size) = declaration.size {
                if !sighting.sizes.contains(&size) {
                    sighting.sizes.push(size);
                }
            }
        }
    }

    let estimates: Vec<CostEstimate> = sightings.iter().map(Sighting::estimate).collect();
    let total_estimated_cost = estimates.iter().map(|e| e.estimated_new_cost).sum();

    if !file_types.is_empty() {
        tracing::debug!(
            "IaC changes: {} file type(s), {} estimate(s), ${:.2}/month",
            file_types.len(),
            estimates.len(),
            total_estimated_cost
        );
    }

    DevOpsAnalysis {
        has_dev_ops_changes: !file_types.is_empty(),
        file_types,
        estimates,
        total_estimated_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cost::{CostConfidence, InfraFileType};

    fn file(path: &str, diff: &str) -> FileDiff {
        FileDiff {
            path: path.to_string(),
            diff: diff.to_string(),
        }
    }

    #[test]
    fn test_two_instances_collapse_into_one_estimate() {
        let diff = "\
diff --git a/main.tf b/main.tf
@@ -0,0 +1,8 @@
+resource \"aws_instance\" \"small\" {
+  instance_type = \"t3.micro\"
+}
+resource \"aws_instance\" \"big\" {
+  instance_type = \"m5.xlarge\"
+}
";
        let analysis = analyze_devops_files(&[file("main.tf", diff)]);
        assert!(analysis.has_dev_ops_changes);
        assert_eq!(analysis.file_types, vec![InfraFileType::Terraform]);
        assert_eq!(analysis.estimates.len(), 1);
        let ec2 = &analysis.estimates[0];
        assert_eq!(ec2.resource_type, "ec2");
        assert_eq!(ec2.confidence, CostConfidence::Medium);
        assert_eq!(ec2.estimated_new_cost, 140.16);
        assert_eq!(analysis.total_estimated_cost, ec2.estimated_new_cost);
        assert!(ec2.details.as_deref().unwrap().contains("t3.micro, m5.xlarge"));
    }

    #[test]
    fn test_total_is_exact_sum_across_files() {
        let tf = "+resource \"aws_lb\" \"a\" {\n+resource \"aws_lambda_function\" \"f\" {\n";
        let cfn = "+AWSTemplateFormatVersion: '2010-09-09'\n+    Type: AWS::RDS::DBInstance\n+      DBInstanceClass: db.t3.medium\n+    Type: AWS::ElasticLoadBalancingV2::LoadBalancer\n";
        let analysis = analyze_devops_files(&[file("lb.tf", tf), file("stack.yaml", cfn)]);

        let kinds: Vec<&str> = analysis.estimates.iter().map(|e| e.resource_type.as_str()).collect();
        assert_eq!(kinds, vec!["load_balancer", "lambda", "rds"]);
        let sum: f64 = analysis.estimates.iter().map(|e| e.estimated_new_cost).sum();
        assert_eq!(analysis.total_estimated_cost, sum);
        assert_eq!(analysis.estimates[0].confidence, CostConfidence::High);
        assert_eq!(analysis.estimates[1].confidence, CostConfidence::Low);
    }

    #[test]
    fn test_classified_files_without_resources_still_count() {
        let analysis = analyze_devops_files(&[
            file("Dockerfile", "+FROM alpine\n"),
            file("vars.tf", "+variable \"region\" {}\n"),
            file(".github/workflows/ci.yml", "+on: push\n"),
        ]);
        assert!(analysis.has_dev_ops_changes);
        assert_eq!(
            analysis.file_types,
            vec![InfraFileType::Docker, InfraFileType::Terraform, InfraFileType::GithubActions]
        );
        assert!(analysis.estimates.is_empty());
        assert_eq!(analysis.total_estimated_cost, 0.0);
    }

    #[test]
    fn test_no_infra_files_is_empty_result() {
        let analysis = analyze_devops_files(&[file("src/lib.rs", "+fn main() {}\n")]);
        assert_eq!(analysis, DevOpsAnalysis::default());
        assert_eq!(analyze_devops_files(&[]), DevOpsAnalysis::default());
    }

    #[test]
    fn test_unspecified_size_uses_base_price() {
        let analysis = analyze_devops_files(&[file("db.tf", "+resource \"aws_db_instance\" \"db\" {\n+}\n")]);
        assert_eq!(analysis.estimates[0].estimated_new_cost, 49.64);
        assert!(analysis.estimates[0]
            .details
            .as_deref()
            .unwrap()
            .contains("size not specified"));
    }
}
