use kube::CustomResourceExt;
use lbcfd_kubernetes::crd;

fn main() -> anyhow::Result<()> {
    let crds = [
        crd::load_balancer_driver::LoadBalancerDriver::crd(),
        crd::load_balancer::LoadBalancer::crd(),
        crd::backend_group::BackendGroup::crd(),
        crd::backend_record::BackendRecord::crd(),
        crd::bind::Bind::crd(),
    ];
    let docs = crds
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", docs.join("---\n"));
    Ok(())
}
