use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use ixa_relations::groups::{
    GroupConstructionInfo, GroupId, GroupSampler, GroupsDataManager, GroupsPluginData,
};
use ixa_relations::rand::rngs::StdRng;
use ixa_relations::rand::SeedableRng;
use ixa_relations::random::WeightedSampler;
use ixa_relations::{PersonId, SimulationContext};

const SEED: u64 = 42;
const GROUP_SIZE: usize = 1_000;

fn setup() -> (GroupsDataManager, GroupId) {
    let context = Rc::new(SimulationContext::new());
    let data = GroupsPluginData::builder()
        .add_group_type("household")
        .build()
        .unwrap();
    let mut manager = GroupsDataManager::new(data, context.clone()).unwrap();
    let group = manager
        .add_group(GroupConstructionInfo::new("household"))
        .unwrap();
    for _ in 0..GROUP_SIZE {
        let person = context.add_person();
        manager.add_person_to_group(person, group).unwrap();
    }
    (manager, group)
}

pub fn criterion_benchmark(criterion: &mut Criterion) {
    let mut criterion = criterion.benchmark_group("weighted_sampling");
    let (manager, group) = setup();
    let mut rng = StdRng::seed_from_u64(SEED);

    criterion.bench_function("sample_group_uniform", |bencher| {
        let sampler = GroupSampler::new();
        bencher.iter(|| black_box(manager.sample_group(group, &sampler, &mut rng)));
    });

    criterion.bench_function("sample_group_uniform_excluding", |bencher| {
        let sampler = GroupSampler::new().excluding(PersonId(0));
        bencher.iter(|| black_box(manager.sample_group(group, &sampler, &mut rng)));
    });

    // The scratch buffer is reused, so this measures weighting and the binary search only.
    criterion.bench_function("sample_group_weighted", |bencher| {
        let sampler = GroupSampler::new().weighted_by(|_, person, _| (person.0 % 10) as f64);
        bencher.iter(|| black_box(manager.sample_group(group, &sampler, &mut rng)));
    });

    criterion.bench_function("weighted_sampler_raw", |bencher| {
        let sampler = WeightedSampler::new();
        let candidates: Vec<usize> = (0..GROUP_SIZE).collect();
        bencher.iter(|| {
            let mut weigh = |candidate: usize| (candidate % 7 + 1) as f64;
            black_box(sampler.sample(
                black_box(&candidates),
                None,
                Some(&mut weigh),
                &mut rng,
            ))
        });
    });

    criterion.finish();
}

criterion_group!(weighted_sampling_benches, criterion_benchmark);
criterion_main!(weighted_sampling_benches);
