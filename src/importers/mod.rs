pub mod caffe;
