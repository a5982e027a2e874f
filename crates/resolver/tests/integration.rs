//! Integration tests for the resolver crate

use sprig_errors::{Error, RecipeError, SolveError};
use sprig_repo::{Dependency, RecipeBuilder, Repository};
use sprig_resolver::{ResolutionRequest, Resolver};
use sprig_types::{BuildSystem, EdgeKinds, VariantValue, Version};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A repository shaped like the Gaudi / XQilla recipe universe
fn hep_repository() -> Arc<Repository> {
    let mut repository = Repository::new();

    repository
        .insert(
            RecipeBuilder::new("xerces-c")
                .version("3.2.3")
                .version("3.2.2")
                .finish()
                .unwrap(),
        )
        .unwrap();

    repository
        .insert(
            RecipeBuilder::new("xqilla")
                .build_system(BuildSystem::Autotools)
                .description("XQuery and XPath 2 library on top of Xerces-C")
                .version("2.3.3")
                .variant("debug", false, "Build a debugging version.")
                .variant("shared", true, "Build shared libraries.")
                .depends_on(Dependency::on("xerces-c"))
                .patch("xerces-3-2-0.patch", "@:2.3.3")
                .patch("gcc11.patch", "%gcc@11:")
                .finish()
                .unwrap(),
        )
        .unwrap();

    repository
        .insert(
            RecipeBuilder::new("boost")
                .version("1.73.0")
                .version("1.67.0")
                .version("1.66.0")
                .variant("python", false, "Build the Boost.Python library")
                .finish()
                .unwrap(),
        )
        .unwrap();

    repository
        .insert(
            RecipeBuilder::new("cmake")
                .version("3.21.4")
                .finish()
                .unwrap(),
        )
        .unwrap();

    repository
        .insert(RecipeBuilder::new("fmt").version("8.0.1").finish().unwrap())
        .unwrap();

    repository
        .insert(
            RecipeBuilder::new("cppunit")
                .version("1.15.1")
                .finish()
                .unwrap(),
        )
        .unwrap();

    repository
        .insert(
            RecipeBuilder::new("doxygen")
                .version("1.9.3")
                .variant("graphviz", false, "Build with graphviz support")
                .finish()
                .unwrap(),
        )
        .unwrap();

    repository
        .insert(
            RecipeBuilder::new("gaudi")
                .description("An experiment-independent HEP event data processing framework")
                .version("master")
                .version("35.0")
                .version("34.0")
                .version("33.2")
                .version("33.1")
                .version("33.0")
                .version("32.2")
                .version("30.5")
                .variant("optional", false, "Build most optional components and tests")
                .variant("docs", false, "Build documentation with Doxygen")
                .variant("vtune", false, "Build with Intel VTune profiler support")
                .conflicts_with("+vtune", "+optional")
                .depends_on(Dependency::on("boost").range("1.67.0:").require("+python"))
                .depends_on(Dependency::on("cmake").kinds(EdgeKinds::build_only()))
                .depends_on(Dependency::on("fmt").when("@33.2:"))
                .depends_on(Dependency::on("cppunit").when("+optional"))
                .depends_on(Dependency::on("doxygen").when("+docs").require("+graphviz"))
                .patch("build_testing.patch", "@:34.99")
                .patch("link_target_fixes.patch", "@33.0:34.99")
                .patch("link_target_fixes32.patch", "@:32.2")
                .finish()
                .unwrap(),
        )
        .unwrap();

    Arc::new(repository)
}

fn version(s: &str) -> Version {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_xqilla_defaults() {
    let resolver = Resolver::new(hep_repository());
    let graph = resolver
        .resolve(ResolutionRequest::parse("xqilla").unwrap())
        .await
        .unwrap();

    assert_eq!(graph.len(), 2);

    let xqilla = graph.get("xqilla").unwrap();
    assert_eq!(xqilla.version, version("2.3.3"));
    assert_eq!(xqilla.variants.get("shared"), Some(&VariantValue::Bool(true)));
    assert_eq!(xqilla.variants.get("debug"), Some(&VariantValue::Bool(false)));
    assert_eq!(xqilla.build_system, BuildSystem::Autotools);
    assert_eq!(xqilla.edges.len(), 1);
    assert_eq!(xqilla.edges[0].provider, "xerces-c");
    assert_eq!(xqilla.edges[0].kinds, EdgeKinds::build_link());

    // Version-gated patch applies, compiler-gated patch does not
    assert_eq!(xqilla.patches, vec!["xerces-3-2-0.patch".to_string()]);

    let xerces = graph.get("xerces-c").unwrap();
    assert_eq!(xerces.version, version("3.2.3"));
}

#[tokio::test]
async fn test_gaudi_capped_with_optional_pulls_cppunit() {
    let resolver = Resolver::new(hep_repository());
    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi@:34.99 +optional").unwrap())
        .await
        .unwrap();

    let gaudi = graph.get("gaudi").unwrap();
    assert_eq!(gaudi.version, version("34.0"));
    assert_eq!(
        gaudi.variants.get("optional"),
        Some(&VariantValue::Bool(true))
    );

    // The conditional edge is active and its provider is in the graph
    assert!(graph.get("cppunit").is_some());
    assert!(gaudi.edges.iter().any(|e| e.provider == "cppunit"));

    // Patch annotations follow the final version without constraining it
    assert!(gaudi.patches.contains(&"build_testing.patch".to_string()));
    assert!(gaudi
        .patches
        .contains(&"link_target_fixes.patch".to_string()));
    assert!(!gaudi
        .patches
        .contains(&"link_target_fixes32.patch".to_string()));
}

#[tokio::test]
async fn test_false_conditions_leave_no_trace() {
    let resolver = Resolver::new(hep_repository());
    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi").unwrap())
        .await
        .unwrap();

    // optional and docs default to false, so neither conditional provider
    // nor its edge may appear
    assert!(graph.get("cppunit").is_none());
    assert!(graph.get("doxygen").is_none());
    let gaudi = graph.get("gaudi").unwrap();
    assert!(!gaudi.edges.iter().any(|e| e.provider == "cppunit"));
    assert!(!gaudi.edges.iter().any(|e| e.provider == "doxygen"));
}

#[tokio::test]
async fn test_newest_version_preferred_and_branch_avoided() {
    let resolver = Resolver::new(hep_repository());

    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi").unwrap())
        .await
        .unwrap();
    assert_eq!(graph.get("gaudi").unwrap().version, version("35.0"));

    // A branch version is selected only when named exactly
    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi@master").unwrap())
        .await
        .unwrap();
    assert_eq!(graph.get("gaudi").unwrap().version, version("master"));
    // master is not in the @33.2: range, so the conditional fmt edge is off
    assert!(graph.get("fmt").is_none());
}

#[tokio::test]
async fn test_version_conditional_edge() {
    let resolver = Resolver::new(hep_repository());

    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi@35.0").unwrap())
        .await
        .unwrap();
    assert!(graph.get("fmt").is_some());

    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi@30.5").unwrap())
        .await
        .unwrap();
    assert!(graph.get("fmt").is_none());
}

#[tokio::test]
async fn test_edge_requirements_override_provider_defaults() {
    let resolver = Resolver::new(hep_repository());
    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi +docs").unwrap())
        .await
        .unwrap();

    // boost defaults to ~python but the edge demands +python
    let boost = graph.get("boost").unwrap();
    assert_eq!(boost.version, version("1.73.0"));
    assert_eq!(boost.variants.get("python"), Some(&VariantValue::Bool(true)));

    // doxygen is pulled by +docs and must carry +graphviz
    let doxygen = graph.get("doxygen").unwrap();
    assert_eq!(
        doxygen.variants.get("graphviz"),
        Some(&VariantValue::Bool(true))
    );
}

#[tokio::test]
async fn test_constraint_satisfaction_on_every_edge() {
    let repository = hep_repository();
    let resolver = Resolver::new(Arc::clone(&repository));
    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi +optional +docs").unwrap())
        .await
        .unwrap();

    for node in graph.nodes_in_order() {
        for template in repository.recipe(&node.name).unwrap().dependencies() {
            let Some(provider) = graph.get(&template.provider) else {
                continue;
            };
            if !node.edges.iter().any(|e| e.provider == template.provider) {
                continue;
            }
            assert!(
                template.versions.contains(&provider.version),
                "{} -> {} violates @{}",
                node.name,
                provider.name,
                template.versions
            );
            for requirement in &template.requirements {
                assert_eq!(
                    provider.variants.get(&requirement.name),
                    Some(&requirement.value),
                    "{} -> {} violates {}",
                    node.name,
                    provider.name,
                    requirement
                );
            }
        }
    }
}

#[tokio::test]
async fn test_topological_order_puts_dependencies_first() {
    let resolver = Resolver::new(hep_repository());
    let graph = resolver
        .resolve(ResolutionRequest::parse("gaudi +optional +docs").unwrap())
        .await
        .unwrap();

    let order: Vec<&str> = graph.nodes_in_order().map(|n| n.name.as_str()).collect();
    for node in graph.nodes_in_order() {
        let consumer_pos = order.iter().position(|&n| n == node.name).unwrap();
        for edge in &node.edges {
            let provider_pos = order.iter().position(|&n| n == edge.provider).unwrap();
            assert!(
                provider_pos < consumer_pos,
                "{} must precede {}",
                edge.provider,
                node.name
            );
        }
    }
}

#[tokio::test]
async fn test_determinism() {
    let resolver = Resolver::new(hep_repository());

    let first = resolver
        .resolve(ResolutionRequest::parse("gaudi@:34.99 +optional").unwrap())
        .await
        .unwrap();
    let second = resolver
        .resolve(ResolutionRequest::parse("gaudi@:34.99 +optional").unwrap())
        .await
        .unwrap();

    assert_eq!(first, second);

    // Byte-identical once serialized, not merely structurally equal
    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn test_diamond_converges_on_a_single_instance() {
    let mut repository = Repository::new();
    repository
        .insert(
            RecipeBuilder::new("zlib")
                .version("1.2.11")
                .version("1.2.8")
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("curl")
                .version("8.5.0")
                .depends_on(Dependency::on("zlib").range("1.2.11:"))
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("libssh")
                .version("0.10.6")
                .depends_on(Dependency::on("zlib").range(":1.2.11"))
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("git")
                .version("2.41.0")
                .depends_on(Dependency::on("curl"))
                .depends_on(Dependency::on("libssh"))
                .finish()
                .unwrap(),
        )
        .unwrap();

    let resolver = Resolver::new(Arc::new(repository));
    let graph = resolver
        .resolve(ResolutionRequest::parse("git").unwrap())
        .await
        .unwrap();

    // Both paths converge on the one zlib that satisfies both ranges
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.get("zlib").unwrap().version, version("1.2.11"));
}

#[tokio::test]
async fn test_unsatisfiable_variant_requirements() {
    let mut repository = Repository::new();
    repository
        .insert(
            RecipeBuilder::new("hepmc")
                .version("3.2.5")
                .variant("rootio", false, "Build ROOT I/O support")
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("generator")
                .version("1.0")
                .depends_on(Dependency::on("hepmc").require("+rootio"))
                .depends_on(Dependency::on("hepmc").require("~rootio"))
                .finish()
                .unwrap(),
        )
        .unwrap();

    let resolver = Resolver::new(Arc::new(repository));
    let error = resolver
        .resolve(ResolutionRequest::parse("generator").unwrap())
        .await
        .unwrap_err();

    let Error::Solve(SolveError::Unsatisfiable { conflicts }) = error else {
        panic!("expected Unsatisfiable, got {error:?}");
    };
    assert!(conflicts
        .iter()
        .any(|c| c.contains("generator requires +rootio on hepmc")));
    assert!(conflicts
        .iter()
        .any(|c| c.contains("generator requires ~rootio on hepmc")));
}

#[tokio::test]
async fn test_unsatisfiable_declared_conflict() {
    let resolver = Resolver::new(hep_repository());
    let error = resolver
        .resolve(ResolutionRequest::parse("gaudi +optional +vtune").unwrap())
        .await
        .unwrap_err();

    assert!(error.is_unsatisfiable());
    let Error::Solve(SolveError::Unsatisfiable { conflicts }) = error else {
        panic!("expected Unsatisfiable");
    };
    assert!(conflicts.iter().any(|c| c.contains("conflicts with +vtune")));
    assert!(conflicts
        .iter()
        .any(|c| c.contains("request +vtune on gaudi")));
}

#[tokio::test]
async fn test_unsatisfiable_version_ranges() {
    let mut repository = Repository::new();
    repository
        .insert(
            RecipeBuilder::new("zlib")
                .version("2.0")
                .version("1.0")
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("a")
                .version("1.0")
                .depends_on(Dependency::on("zlib").range("2.0:"))
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("b")
                .version("1.0")
                .depends_on(Dependency::on("zlib").range(":1.0"))
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("top")
                .version("1.0")
                .depends_on(Dependency::on("a"))
                .depends_on(Dependency::on("b"))
                .finish()
                .unwrap(),
        )
        .unwrap();

    let resolver = Resolver::new(Arc::new(repository));
    let error = resolver
        .resolve(ResolutionRequest::parse("top").unwrap())
        .await
        .unwrap_err();

    let Error::Solve(SolveError::Unsatisfiable { conflicts }) = error else {
        panic!("expected Unsatisfiable, got {error:?}");
    };
    assert!(conflicts.iter().any(|c| c.contains("a depends on zlib@2.0:")));
    assert!(conflicts.iter().any(|c| c.contains("b depends on zlib@:1.0")));
}

#[tokio::test]
async fn test_cyclic_input_rejected() {
    let mut repository = Repository::new();
    repository
        .insert(
            RecipeBuilder::new("a")
                .version("1.0")
                .depends_on(Dependency::on("b"))
                .finish()
                .unwrap(),
        )
        .unwrap();
    repository
        .insert(
            RecipeBuilder::new("b")
                .version("1.0")
                .depends_on(Dependency::on("a"))
                .finish()
                .unwrap(),
        )
        .unwrap();

    let resolver = Resolver::new(Arc::new(repository));
    let error = resolver
        .resolve(ResolutionRequest::parse("a").unwrap())
        .await
        .unwrap_err();

    let Error::Solve(SolveError::CyclicDependency { cycle }) = error else {
        panic!("expected CyclicDependency, got {error:?}");
    };
    assert_eq!(cycle, vec!["a", "b", "a"]);
}

#[tokio::test]
async fn test_unknown_package_surfaces_immediately() {
    let resolver = Resolver::new(hep_repository());

    let error = resolver
        .resolve(ResolutionRequest::parse("nonexistent").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        Error::Recipe(RecipeError::UnknownPackage { .. })
    ));

    // An edge naming an unregistered package is just as fatal
    let mut repository = Repository::new();
    repository
        .insert(
            RecipeBuilder::new("broken")
                .version("1.0")
                .depends_on(Dependency::on("missing"))
                .finish()
                .unwrap(),
        )
        .unwrap();
    let resolver = Resolver::new(Arc::new(repository));
    let error = resolver
        .resolve(ResolutionRequest::parse("broken").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        Error::Recipe(RecipeError::UnknownPackage { ref name }) if name == "missing"
    ));
}

#[tokio::test]
async fn test_cancellation_is_distinct_from_unsatisfiable() {
    let resolver = Resolver::new(hep_repository());
    let token = Arc::new(AtomicBool::new(false));
    token.store(true, Ordering::Relaxed);

    let request = ResolutionRequest::parse("gaudi +optional")
        .unwrap()
        .with_cancel_token(Arc::clone(&token));
    let error = resolver.resolve(request).await.unwrap_err();

    assert!(matches!(error, Error::Cancelled));
    assert!(!error.is_unsatisfiable());
}

#[tokio::test]
async fn test_compiler_gated_patch() {
    let resolver = Resolver::new(hep_repository());

    let graph = resolver
        .resolve(ResolutionRequest::parse("xqilla %gcc@11.2.0").unwrap())
        .await
        .unwrap();
    let xqilla = graph.get("xqilla").unwrap();
    assert!(xqilla.patches.contains(&"gcc11.patch".to_string()));
    assert_eq!(
        xqilla.compiler.as_ref().unwrap().version,
        version("11.2.0")
    );

    let graph = resolver
        .resolve(ResolutionRequest::parse("xqilla %gcc@9.3.0").unwrap())
        .await
        .unwrap();
    assert!(!graph
        .get("xqilla")
        .unwrap()
        .patches
        .contains(&"gcc11.patch".to_string()));
}

#[tokio::test]
async fn test_resolve_many_is_parallel_and_deterministic() {
    let resolver = Resolver::new(hep_repository());

    let requests = vec![
        ResolutionRequest::parse("gaudi +optional").unwrap(),
        ResolutionRequest::parse("xqilla").unwrap(),
        ResolutionRequest::parse("gaudi +optional").unwrap(),
    ];
    let graphs = resolver.resolve_many(requests).await.unwrap();

    assert_eq!(graphs.len(), 3);
    assert_eq!(graphs[0], graphs[2]);
    assert_eq!(graphs[1].get("xqilla").unwrap().version, version("2.3.3"));
}

#[tokio::test]
async fn test_events_report_solve_lifecycle() {
    let resolver = Resolver::new(hep_repository());
    let (tx, mut rx) = sprig_events::channel();

    let request = ResolutionRequest::parse("xqilla")
        .unwrap()
        .with_event_sender(tx);
    resolver.resolve(request).await.unwrap();

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    assert_eq!(names.first(), Some(&"solve_started"));
    assert_eq!(names.last(), Some(&"solve_succeeded"));
    assert!(names.contains(&"node_expanded"));
}
