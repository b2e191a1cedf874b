//! File classification and resource declaration matching for IaC diffs.

use super::pricing::ResourceKind;
use crate::types::cost::InfraFileType;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref TF_RESOURCE: Regex =
        Regex::new(r#"^\s*resource\s+"(aws_[a-z0-9_]+)""#).unwrap();
    static ref CFN_TYPE: Regex =
        Regex::new(r#"^\s*"?Type"?\s*:\s*"?(AWS::[A-Za-z0-9]+::[A-Za-z0-9]+)"#).unwrap();
    static ref SERVERLESS_HANDLER: Regex = Regex::new(r"^\s*handler\s*:").unwrap();
    static ref SIZE_ATTRIBUTE: Regex = Regex::new(
        r#"^\s*"?(?:instance_type|instance_class|node_type|InstanceType|DBInstanceClass|CacheNodeType)"?\s*[:=]\s*"?([A-Za-z0-9.\-]+)"#
    )
    .unwrap();
}

/// A single resource declaration found in a diff fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDeclaration {
    pub kind: ResourceKind,
    pub size: Option<String>,
}

fn has_yaml_or_json_ext(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".yml") || lower.ends_with(".yaml") || lower.ends_with(".json")
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Classifies a file as an infrastructure-as-code flavour, if any.
///
/// The path decides in most cases; CloudFormation templates with generic
/// names are recognised by their content.
pub fn classify_file(path: &str, diff: &str) -> Option<InfraFileType> {
    let lower = path.to_ascii_lowercase();
    let name = file_name(path);

    if name == "serverless.yml" || name == "serverless.yaml" {
        return Some(InfraFileType::Serverless);
    }
    if lower.contains(".github/workflows/") && (name.ends_with(".yml") || name.ends_with(".yaml")) {
        return Some(InfraFileType::GithubActions);
    }
    let in_k8s_dir = ["k8s/", "kubernetes/", "helm/", "charts/"]
        .iter()
        .any(|dir| lower.starts_with(dir) || lower.contains(&format!("/{}", dir)));
    if name.starts_with("kustomization") || (in_k8s_dir && (has_yaml_or_json_ext(&lower) || name.ends_with(".tpl"))) {
        return Some(InfraFileType::Kubernetes);
    }
    if name == "dockerfile"
        || name.starts_with("dockerfile.")
        || name.ends_with(".dockerfile")
        || name.starts_with("docker-compose")
    {
        return Some(InfraFileType::Docker);
    }
    if lower.ends_with(".tf") || lower.ends_with(".tfvars") || lower.ends_with(".tf.json") {
        return Some(InfraFileType::Terraform);
    }
    if has_yaml_or_json_ext(&lower) {
        let cfn_path = lower.contains("cloudformation") || lower.contains("cfn") || name.starts_with("template.");
        let cfn_body = diff.contains("AWSTemplateFormatVersion")
            || diff.contains("Type: AWS::")
            || diff.contains("\"Type\": \"AWS::");
        if cfn_path || cfn_body {
            return Some(InfraFileType::Cloudformation);
        }
    }
    None
}

fn terraform_kind(resource: &str) -> Option<ResourceKind> {
    match resource {
        "aws_instance" | "aws_launch_template" => Some(ResourceKind::Ec2),
        "aws_db_instance" | "aws_rds_cluster" | "aws_rds_cluster_instance" => Some(ResourceKind::Rds),
        "aws_lambda_function" => Some(ResourceKind::Lambda),
        "aws_s3_bucket" => Some(ResourceKind::S3),
        "aws_ecs_cluster" | "aws_ecs_service" => Some(ResourceKind::Ecs),
        "aws_lb" | "aws_alb" | "aws_elb" => Some(ResourceKind::LoadBalancer),
        "aws_nat_gateway" => Some(ResourceKind::NatGateway),
        "aws_elasticache_cluster" | "aws_elasticache_replication_group" => Some(ResourceKind::Elasticache),
        _ => None,
    }
}

fn cloudformation_kind(resource: &str) -> Option<ResourceKind> {
    match resource {
        "AWS::EC2::Instance" => Some(ResourceKind::Ec2),
        "AWS::RDS::DBInstance" | "AWS::RDS::DBCluster" => Some(ResourceKind::Rds),
        "AWS::Lambda::Function" | "AWS::Serverless::Function" => Some(ResourceKind::Lambda),
        "AWS::S3::Bucket" => Some(ResourceKind::S3),
        "AWS::ECS::Cluster" | "AWS::ECS::Service" => Some(ResourceKind::Ecs),
        "AWS::ElasticLoadBalancingV2::LoadBalancer" | "AWS::ElasticLoadBalancing::LoadBalancer" => {
            Some(ResourceKind::LoadBalancer)
        }
        "AWS::EC2::NatGateway" => Some(ResourceKind::NatGateway),
        "AWS::ElastiCache::CacheCluster" | "AWS::ElastiCache::ReplicationGroup" => {
            Some(ResourceKind::Elasticache)
        }
        _ => None,
    }
}

/// Lines present after the change, without their diff marker.
fn resulting_lines(diff: &str) -> impl Iterator<Item = &str> {
    diff.lines().filter_map(|line| {
        if line.starts_with('-') || line.starts_with("+++") || line.starts_with("diff --git") || line.starts_with("@@") {
            return None;
        }
        Some(line.strip_prefix('+').unwrap_or(line))
    })
}

/// Finds resource declarations in a fragment of the given flavour.
///
/// A size attribute binds to the most recent sized declaration that has no
/// size yet.
pub fn detect_resources(file_type: InfraFileType, diff: &str) -> Vec<ResourceDeclaration> {
    let mut found: Vec<ResourceDeclaration> = Vec::new();
    let mut open_sized: Option<usize> = None;

    for line in resulting_lines(diff) {
        let kind = match file_type {
            InfraFileType::Terraform => TF_RESOURCE
                .captures(line)
                .and_then(|c| terraform_kind(&c[1])),
            InfraFileType::Cloudformation => CFN_TYPE
                .captures(line)
                .and_then(|c| cloudformation_kind(&c[1])),
            InfraFileType::Serverless => {
                if SERVERLESS_HANDLER.is_match(line) {
                    Some(ResourceKind::Lambda)
                } else {
                    CFN_TYPE.captures(line).and_then(|c| cloudformation_kind(&c[1]))
                }
            }
            _ => None,
        };

        if let Some(kind) = kind {
            open_sized = if kind.is_sized() { Some(found.len()) } else { None };
            found.push(ResourceDeclaration { kind, size: None });
            continue;
        }

        if let (Some(slot), Some(caps)) = (open_sized, SIZE_ATTRIBUTE.captures(line)) {
            let declaration = &mut found[slot];
            if declaration.size.is_none() {
                declaration.size = Some(caps[1].to_ascii_lowercase());
            }
        }
    }

    found
}
