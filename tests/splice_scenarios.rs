use jvm_splice::jvm::code::listing::{parse_classes, render_instruction};
use jvm_splice::jvm::model::{ClassBody, ClassPool, MethodBody, MethodKey};
use jvm_splice::jvm::{BinaryName, Name};
use jvm_splice::splice::{
    resolve, ClassTransformer, MethodSource, SlotRemap, SpliceDescriptor, SpliceEngine,
    SpliceOutcome, SpliceRegistry, SpliceRequest, TransformOutcome, TransformReport,
};

const TARGETS: &str = "\
class demo/Target

method public <init> ()V
  aload 0
  invokespecial java/lang/Object.<init> ()V
  return
end

method public f (I)I
  iload 1
  ifeq Lzero
  iload 1
  ireturn
Lzero:
  iconst_m1
  ireturn
end

method public h ()V
  iconst_1
  putstatic demo/Target.calls I
  return
end

method public wide (IJ)J
  lload 2
  lreturn
end

method public name ()Ljava/lang/String;
  ldc \"target\"
  areturn
end
";

const MIXINS: &str = "\
class demo/Mixin

method public static g (I)V
  iload 0
  invokestatic demo/Log.value (I)V
  return
end

method public static h ()V
  iconst_2
  putstatic demo/Target.calls I
  getstatic demo/Target.calls I
  pop
  return
end

method public static before ()V
  nop
  return
end

method public static init ()V
  aconst_null
  putstatic demo/Target.last Ljava/lang/Object;
  return
end

method public static wide (IJ)J
  iload 0
  lload 1
  lstore 3
  lload 3
  lreturn
end

method public static name ()Ljava/lang/String;
  nop
end
";

fn pool() -> ClassPool {
    let mut pool = ClassPool::new();
    pool.extend(parse_classes(TARGETS).unwrap());
    pool.extend(parse_classes(MIXINS).unwrap());
    pool
}

fn key(text: &str) -> MethodKey {
    MethodKey::parse(text).unwrap()
}

fn target_class(pool: &ClassPool) -> &ClassBody {
    pool.get(&BinaryName::from_string(String::from("demo/Target")).unwrap())
        .unwrap()
}

fn request(pool: &ClassPool, target: &str, source: &str, kind: &str, priority: i32) -> SpliceRequest {
    let descriptor = SpliceDescriptor::parse(target, source, kind, priority).unwrap();
    let body = pool.find_method(&descriptor.source).unwrap().clone();
    SpliceRequest::new(descriptor, body)
}

fn render(body: &MethodBody) -> Vec<String> {
    body.instructions.iter().map(render_instruction).collect()
}

fn transform(pool: &ClassPool, descriptors: Vec<SpliceDescriptor>) -> (ClassBody, TransformReport) {
    let registry = SpliceRegistry::new(descriptors);
    match ClassTransformer::default().transform_class(target_class(pool), &registry, pool) {
        TransformOutcome::Transformed { class, report } => (class, report),
        other => panic!("expected a transformation, got {:?}", other),
    }
}

#[test]
fn replace_takes_the_source_body() {
    let pool = pool();
    let target = pool.find_method(&key("demo/Target.wide(IJ)J")).unwrap();
    let request = request(&pool, "demo/Target.wide(IJ)J", "demo/Mixin.wide(IJ)J", "REPLACE", 0);

    let merged = SpliceEngine::new().apply(target, &request).unwrap();
    assert_eq!(merged.descriptor, target.descriptor);
    assert_eq!(merged.descriptor, request.source_body.descriptor);
    assert_eq!(merged.instructions.len(), request.source_body.instructions.len());
    assert_eq!(
        render(&merged),
        vec!["iload 1", "lload 2", "lstore 4", "lload 4", "lreturn"]
    );
    assert_eq!(merged.max_locals, 6);
}

#[test]
fn before_keeps_the_target_intact() {
    let pool = pool();
    let target = pool.find_method(&key("demo/Target.f(I)I")).unwrap();
    let request = request(&pool, "demo/Target.f(I)I", "demo/Mixin.before()V", "BEFORE", 0);

    let merged = SpliceEngine::new().apply(target, &request).unwrap();
    assert_eq!(merged.instructions[0], request.source_body.instructions[0]);
    assert_eq!(&merged.instructions[1..], &target.instructions[..]);
    assert_eq!(merged.max_locals, target.max_locals);
}

#[test]
fn after_uses_one_temporary_for_all_returns() {
    let pool = pool();
    let target = pool.find_method(&key("demo/Target.f(I)I")).unwrap();
    assert_eq!(target.max_locals, 2);
    let request = request(&pool, "demo/Target.f(I)I", "demo/Mixin.g(I)V", "AFTER", 0);

    let merged = SpliceEngine::new().apply(target, &request).unwrap();
    assert_eq!(merged.max_locals, 3);

    let rendered = render(&merged);
    let block = ["istore 2", "iload 1", "invokestatic demo/Log.value (I)V", "iload 2", "ireturn"];
    let sites: Vec<usize> = rendered
        .iter()
        .enumerate()
        .filter(|(_, insn)| insn.as_str() == "ireturn")
        .map(|(idx, _)| idx)
        .collect();
    assert_eq!(sites.len(), 2);
    for site in sites {
        assert_eq!(&rendered[site + 1 - block.len()..=site], &block[..]);
    }
}

#[test]
fn parameters_and_locals_shift_independently() {
    let pool = pool();
    let target = pool.find_method(&key("demo/Target.wide(IJ)J")).unwrap();
    let source = pool.find_method(&key("demo/Mixin.wide(IJ)J")).unwrap();

    let remap = SlotRemap::between(source, target);
    assert_eq!(remap.map(0).unwrap(), 1);
    assert_eq!(remap.map(1).unwrap(), 2);
    for local in 3..10u16 {
        assert_eq!(remap.map(local).unwrap(), local + 1);
    }
}

#[test]
fn replace_excludes_everything_else() {
    let pool = pool();
    let resolution = resolve(vec![
        request(&pool, "demo/Target.h()V", "demo/Mixin.before()V", "BEFORE", 1),
        request(&pool, "demo/Target.h()V", "demo/Mixin.h()V", "REPLACE", 10_000),
        request(&pool, "demo/Target.h()V", "demo/Mixin.before()V", "TAIL", -5),
    ]);
    assert_eq!(resolution.applied.len(), 1);
    assert_eq!(resolution.applied[0].descriptor.source, key("demo/Mixin.h()V"));
    assert_eq!(resolution.discarded.len(), 2);
}

#[test]
fn replace_without_returns_gets_a_default() {
    let pool = pool();
    let target = pool.find_method(&key("demo/Target.name()Ljava/lang/String;")).unwrap();
    let request = request(
        &pool,
        "demo/Target.name()Ljava/lang/String;",
        "demo/Mixin.name()Ljava/lang/String;",
        "REPLACE",
        0,
    );

    let merged = SpliceEngine::new().apply(target, &request).unwrap();
    assert_eq!(render(&merged), vec!["nop", "aconst_null", "areturn"]);
}

#[test]
fn replace_wins_over_before_regardless_of_priority() {
    let pool = pool();
    let (class, report) = transform(
        &pool,
        vec![
            SpliceDescriptor::parse("demo/Target.h()V", "demo/Mixin.before()V", "BEFORE", 500)
                .unwrap(),
            SpliceDescriptor::parse("demo/Target.h()V", "demo/Mixin.h()V", "REPLACE", 100)
                .unwrap(),
        ],
    );
    assert_eq!(report.applied(), 1);
    assert_eq!(report.discarded(), 1);
    for (descriptor, outcome) in &report.entries {
        match descriptor.kind.name() {
            "BEFORE" => assert!(matches!(outcome, SpliceOutcome::Discarded)),
            _ => assert!(matches!(outcome, SpliceOutcome::Applied)),
        }
    }

    let h = key("demo/Target.h()V");
    let merged = class.method(&h.name, &h.descriptor).unwrap();
    let source = pool.find_method(&key("demo/Mixin.h()V")).unwrap();
    assert_eq!(merged.instructions, source.instructions);
}

#[test]
fn head_runs_after_super_call() {
    let pool = pool();
    let (class, report) = transform(
        &pool,
        vec![SpliceDescriptor::parse(
            "demo/Target.<init>()V",
            "demo/Mixin.init()V",
            "HEAD",
            0,
        )
        .unwrap()],
    );
    assert_eq!(report.applied(), 1);
    assert_eq!(
        render(&class.methods[0]),
        vec![
            "aload 0",
            "invokespecial java/lang/Object.<init> ()V",
            "aconst_null",
            "putstatic demo/Target.last Ljava/lang/Object;",
            "return",
        ]
    );
}

#[test]
fn sources_can_be_spread_over_pools() {
    let targets: ClassPool = {
        let mut pool = ClassPool::new();
        pool.extend(parse_classes(TARGETS).unwrap());
        pool
    };
    let mixins: ClassPool = {
        let mut pool = ClassPool::new();
        pool.extend(parse_classes(MIXINS).unwrap());
        pool
    };
    let pools = [targets, mixins];
    let sources: &[ClassPool] = &pools;
    assert!(sources.find_method(&key("demo/Mixin.g(I)V")).is_some());
    assert!(sources.find_method(&key("demo/Target.h()V")).is_some());
    assert!(sources.find_method(&key("demo/Mixin.missing()V")).is_none());

    let registry = SpliceRegistry::new(vec![SpliceDescriptor::parse(
        "demo/Target.f(I)I",
        "demo/Mixin.g(I)V",
        "TAIL",
        0,
    )
    .unwrap()]);
    let outcome =
        ClassTransformer::default().transform_class(target_class(&pools[0]), &registry, sources);
    assert!(matches!(
        outcome,
        TransformOutcome::Transformed { ref report, .. } if report.applied() == 1
    ));
}
